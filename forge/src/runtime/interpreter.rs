use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use async_recursion::async_recursion;
use tracing::{debug, trace};

use super::environment::{Scope, ScopeKind};
use super::value::*;
use super::{ExecutionContext, HostServices, RuntimeConfig};
use crate::ast::*;
use crate::errors::{ErrorCode, RuntimeError};
use crate::intrinsics;
use crate::modules::ModuleContext;
use crate::source::Range;

/// How a statement finished. Only `Normal` lets the enclosing block go on.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
  Normal(Value),
  Break,
  Continue,
  Return(Value),
}

pub struct Interpreter {
  host: Rc<dyn HostServices>,
  modules: Rc<RefCell<ModuleContext>>,
  config: RuntimeConfig,
  root: Rc<Scope>,
  globals: Rc<Scope>,
  depth: Cell<usize>,
  /// Stack position of the outermost user call in progress.
  stack_base: Cell<usize>,
}

impl Interpreter {
  pub fn new(host: Rc<dyn HostServices>, config: RuntimeConfig) -> Self {
    let root = Scope::root();

    for (name, value) in intrinsics::globals() {
      root.define(name, value);
    }

    for module in intrinsics::modules() {
      root.define(&module.name.clone(), Value::Module(Rc::new(module)));
    }

    Interpreter {
      host,
      modules: Rc::new(RefCell::new(ModuleContext::new())),
      config,
      globals: Scope::push(&root, ScopeKind::Global),
      root,
      depth: Cell::new(0),
      stack_base: Cell::new(0),
    }
  }

  /// Makes a host-provided module, e.g. `File`, reachable by its name.
  pub fn register_module(&self, module: Module) {
    debug!(module = %module.name, "registered module");
    self.root.define(&module.name.clone(), Value::Module(Rc::new(module)));
  }

  pub fn context(&self, range: Range) -> ExecutionContext {
    ExecutionContext {
      host: Rc::clone(&self.host),
      modules: Rc::clone(&self.modules),
      range: Some(range),
    }
  }

  /// Runs a program in the global scope, which survives between calls. Yields the value of the
  /// last expression statement or of a top-level `return`.
  pub async fn evaluate(&self, program: &Program) -> Result<Value, RuntimeError> {
    {
      let mut modules = self.modules.borrow_mut();

      for statement in program.body.iter().filter(|statement| statement.is_directive()) {
        modules.apply(statement);
      }
    }

    debug!(statements = program.body.len(), "evaluating program");

    let completion = self.exec_statements(&program.body, &self.globals).await?;

    match completion {
      | Completion::Normal(value) | Completion::Return(value) => Ok(value),
      | Completion::Break | Completion::Continue => Ok(Value::Null),
    }
  }

  // Statements.

  /// Function declarations are bound before the first statement of the block runs.
  #[async_recursion(?Send)]
  async fn exec_statements(&self, body: &[Statement], scope: &Rc<Scope>) -> Result<Completion, RuntimeError> {
    for statement in body {
      if let Statement::FunctionDeclaration(range, function) = statement {
        let name = function.name.clone().unwrap_or_default();

        scope
          .declare(Store::L, &name, Value::closure(Rc::clone(function), Rc::clone(scope)))
          .map_err(|error| error.with_range(*range))?;
      }
    }

    let mut last = Value::Null;

    for statement in body {
      match self.exec_statement(statement, scope).await? {
        | Completion::Normal(value) => last = value,
        | abrupt => return Ok(abrupt),
      }
    }

    Ok(Completion::Normal(last))
  }

  async fn exec_block(&self, block: &Block, scope: &Rc<Scope>) -> Result<Completion, RuntimeError> {
    let scope = Scope::push(scope, ScopeKind::Block);

    self.exec_statements(&block.body, &scope).await
  }

  #[async_recursion(?Send)]
  async fn exec_statement(&self, statement: &Statement, scope: &Rc<Scope>) -> Result<Completion, RuntimeError> {
    let range = statement.get_range();

    self
      .exec_statement_inner(statement, scope)
      .await
      .map_err(|error| error.with_range(range))
  }

  async fn exec_statement_inner(&self, statement: &Statement, scope: &Rc<Scope>) -> Result<Completion, RuntimeError> {
    let completion = match statement {
      | Statement::VariableDeclaration(_, kind, name, value) => {
        let value = match value {
          | Some(value) => self.eval_expression(value, scope).await?,
          | None => Value::Null,
        };

        scope.declare(kind.store(), name, value)?;
        Completion::Normal(Value::Null)
      },
      | Statement::Assignment(_, target, value) => {
        let value = self.eval_expression(value, scope).await?;

        self.assign(target, value, scope).await?;
        Completion::Normal(Value::Null)
      },
      | Statement::Expression(_, expression) => {
        Completion::Normal(self.eval_expression(expression, scope).await?)
      },
      // Bound by `exec_statements`.
      | Statement::FunctionDeclaration(..) => Completion::Normal(Value::Null),
      | Statement::Return(_, value) => {
        let value = match value {
          | Some(value) => self.eval_expression(value, scope).await?,
          | None => Value::Null,
        };

        Completion::Return(value)
      },
      | Statement::If(_, statement) => self.exec_if(statement, scope).await?,
      | Statement::While(_, test, body) => self.exec_while(test, body, scope).await?,
      | Statement::For(_, statement) => self.exec_for(statement, scope).await?,
      | Statement::ForEach(_, name, iterable, body) => {
        self.exec_for_each(name, iterable, body, scope).await?
      },
      | Statement::Break(_) => Completion::Break,
      | Statement::Continue(_) => Completion::Continue,
      | Statement::Try(_, statement) => self.exec_try(statement, scope).await?,
      | Statement::Throw(_, value) => {
        let value = self.eval_expression(value, scope).await?;

        return Err(RuntimeError::runtime(value.to_display()));
      },
      | Statement::Block(block) => self.exec_block(block, scope).await?,
      // Directives are applied up front and only count at the top level.
      | Statement::Disable(..) | Statement::Able(..) => Completion::Normal(Value::Null),
    };

    Ok(completion)
  }

  async fn exec_if(&self, statement: &IfStatement, scope: &Rc<Scope>) -> Result<Completion, RuntimeError> {
    if self.test(&statement.test, scope).await? {
      return self.exec_block(&statement.consequent, scope).await;
    }

    for clause in &statement.elifs {
      if self.test(&clause.test, scope).await? {
        return self.exec_block(&clause.consequent, scope).await;
      }
    }

    match &statement.alternate {
      | Some(alternate) => self.exec_block(alternate, scope).await,
      | None => Ok(Completion::Normal(Value::Null)),
    }
  }

  async fn exec_while(&self, test: &Expression, body: &Block, scope: &Rc<Scope>) -> Result<Completion, RuntimeError> {
    while self.test(test, scope).await? {
      match self.exec_block(body, scope).await? {
        | Completion::Break => break,
        | Completion::Return(value) => return Ok(Completion::Return(value)),
        | Completion::Normal(_) | Completion::Continue => {},
      }
    }

    Ok(Completion::Normal(Value::Null))
  }

  /// `init` and `update` share one scope; every iteration of the body gets a fresh one.
  async fn exec_for(&self, statement: &ForStatement, scope: &Rc<Scope>) -> Result<Completion, RuntimeError> {
    let scope = Scope::push(scope, ScopeKind::Block);

    if let Some(init) = &statement.init {
      self.exec_statement(init, &scope).await?;
    }

    loop {
      if let Some(test) = &statement.test {
        if !self.test(test, &scope).await? {
          break;
        }
      }

      match self.exec_block(&statement.body, &scope).await? {
        | Completion::Break => break,
        | Completion::Return(value) => return Ok(Completion::Return(value)),
        | Completion::Normal(_) | Completion::Continue => {},
      }

      if let Some(update) = &statement.update {
        self.exec_statement(update, &scope).await?;
      }
    }

    Ok(Completion::Normal(Value::Null))
  }

  async fn exec_for_each(
    &self,
    name: &str,
    iterable: &Expression,
    body: &Block,
    scope: &Rc<Scope>,
  ) -> Result<Completion, RuntimeError> {
    let iterable = self.eval_expression(iterable, scope).await?;

    for item in iterate(&iterable)? {
      let scope = Scope::push(scope, ScopeKind::Block);
      scope.declare(Store::L, name, item)?;

      match self.exec_statements(&body.body, &scope).await? {
        | Completion::Break => break,
        | Completion::Return(value) => return Ok(Completion::Return(value)),
        | Completion::Normal(_) | Completion::Continue => {},
      }
    }

    Ok(Completion::Normal(Value::Null))
  }

  /// The finalizer runs exactly once. If it completes abruptly or fails, that outcome replaces
  /// the pending one.
  async fn exec_try(&self, statement: &TryStatement, scope: &Rc<Scope>) -> Result<Completion, RuntimeError> {
    let outcome = match (self.exec_block(&statement.block, scope).await, &statement.handler) {
      | (Err(error), Some(handler)) => {
        self.host.debug(&format!("caught {error}"));

        let scope = Scope::push(scope, ScopeKind::Block);
        scope.declare(Store::L, &handler.param, Value::String(caught_message(&error)))?;

        self.exec_statements(&handler.body.body, &scope).await
      },
      | (outcome, _) => outcome,
    };

    if let Some(finalizer) = &statement.finalizer {
      match self.exec_block(finalizer, scope).await? {
        | Completion::Normal(_) => {},
        | abrupt => return Ok(abrupt),
      }
    }

    outcome
  }

  async fn test(&self, test: &Expression, scope: &Rc<Scope>) -> Result<bool, RuntimeError> {
    let value = self.eval_expression(test, scope).await?;

    Ok(cast_to_boolean(&value, None))
  }

  async fn assign(&self, target: &Expression, value: Value, scope: &Rc<Scope>) -> Result<(), RuntimeError> {
    match target {
      | Expression::Identifier(_, name) => scope.assign(name, value),
      | Expression::Namespaced(_, store, name) => scope.assign_in(
        *store,
        name,
        value,
        self.config.auto_declare_qualified_writes,
      ),
      | Expression::Member(_, object, name) => match self.eval_expression(object, scope).await? {
        | Value::Object(entries) => {
          entries.borrow_mut().insert(name.clone(), value);
          Ok(())
        },
        | other => Err(RuntimeError::type_error(format!(
          "cannot set property '{name}' of {}",
          other.type_name()
        ))),
      },
      | Expression::Index(_, object, index) => {
        let object = self.eval_expression(object, scope).await?;
        let index = self.eval_expression(index, scope).await?;

        set_index(&object, &index, value)
      },
      | other => Err(RuntimeError::type_error(format!(
        "cannot assign to {}",
        describe(other)
      ))),
    }
  }

  // Expressions.

  #[async_recursion(?Send)]
  pub async fn eval_expression(&self, expression: &Expression, scope: &Rc<Scope>) -> Result<Value, RuntimeError> {
    let range = expression.get_range();

    self
      .eval_expression_inner(expression, scope)
      .await
      .map_err(|error| error.with_range(range))
  }

  async fn eval_expression_inner(&self, expression: &Expression, scope: &Rc<Scope>) -> Result<Value, RuntimeError> {
    let value = match expression {
      | Expression::Number(_, value) => Value::Number(*value),
      | Expression::String(_, value) => Value::String(value.clone()),
      | Expression::Template(_, parts) => {
        let mut text = String::new();

        for part in parts {
          match part {
            | TemplatePart::Text(chunk) => text.push_str(chunk),
            | TemplatePart::Expression(expression) => {
              text.push_str(&self.eval_expression(expression, scope).await?.to_display())
            },
          }
        }

        Value::String(text)
      },
      | Expression::Duration(_, duration) => Value::Number(duration.millis()),
      | Expression::Boolean(_, value) => Value::Boolean(*value),
      | Expression::Null(_) => Value::Null,
      | Expression::Identifier(_, name) => scope
        .lookup(name)
        .ok_or_else(|| RuntimeError::name(format!("'{name}' is not defined")))?,
      | Expression::Namespaced(_, store, name) => scope
        .lookup_in(*store, name)
        .ok_or_else(|| RuntimeError::name(format!("'{store}.{name}' is not defined")))?,
      | Expression::Array(_, items) => {
        let mut values = Vec::with_capacity(items.len());

        for item in items {
          values.push(self.eval_expression(item, scope).await?);
        }

        Value::array(values)
      },
      | Expression::Object(_, properties) => {
        let mut entries = BTreeMap::new();

        for property in properties {
          let value = self.eval_expression(&property.value, scope).await?;
          entries.insert(property.key.clone(), value);
        }

        Value::object(entries)
      },
      | Expression::Member(_, object, name) => {
        let object = self.eval_expression(object, scope).await?;

        self.member(&object, name)?
      },
      | Expression::Index(_, object, index) => {
        let object = self.eval_expression(object, scope).await?;
        let index = self.eval_expression(index, scope).await?;

        get_index(&object, &index)?
      },
      | Expression::Call(range, callee, arguments) => {
        let callee = self.eval_expression(callee, scope).await?;
        let mut positional = vec![];
        let mut named = NamedArgs::new();

        for argument in arguments {
          match argument {
            | Argument::Positional(value) => positional.push(self.eval_expression(value, scope).await?),
            | Argument::Named(_, name, value) => {
              let value = self.eval_expression(value, scope).await?;
              named.insert(name.clone(), value);
            },
          }
        }

        self.call(&callee, positional, named, *range).await?
      },
      | Expression::Unary(_, op, operand) => {
        let operand = self.eval_expression(operand, scope).await?;

        unary(*op, &operand)?
      },
      | Expression::Binary(_, op, left, right) => {
        let left = self.eval_expression(left, scope).await?;
        let right = self.eval_expression(right, scope).await?;

        binary(*op, &left, &right)?
      },
      | Expression::Logical(_, op, left, right) => {
        let left = cast_to_boolean(&self.eval_expression(left, scope).await?, None);

        let result = match (op, left) {
          | (LogicalOp::And, false) => false,
          | (LogicalOp::Or, true) => true,
          | _ => cast_to_boolean(&self.eval_expression(right, scope).await?, None),
        };

        Value::Boolean(result)
      },
      | Expression::Arrow(_, function) => Value::closure(Rc::clone(function), Rc::clone(scope)),
      | Expression::BooleanOp(_, op) => {
        let subject = self.eval_expression(&op.subject, scope).await?;

        let result = match (op.kind, op.force) {
          | (BooleanOpKind::Query, None) => is_boolean_like(&subject),
          | (BooleanOpKind::Query, Some(expected)) => {
            is_boolean_like(&subject) && cast_to_boolean(&subject, None) == expected
          },
          | (BooleanOpKind::Cast, force) => cast_to_boolean(&subject, force),
        };

        Value::Boolean(result != op.negate)
      },
    };

    Ok(value)
  }

  fn member(&self, object: &Value, name: &str) -> Result<Value, RuntimeError> {
    match object {
      | Value::Object(entries) => Ok(entries.borrow().get(name).cloned().unwrap_or(Value::Null)),
      | Value::Module(module) => {
        trace!(module = %module.name, member = name, "module access");

        if !self.modules.borrow().is_enabled(&module.name) {
          return Err(RuntimeError::module(format!(
            "module '{}' is disabled, enable it with able '{}'",
            module.name, module.name
          )));
        }

        module.members.get(name).cloned().ok_or_else(|| {
          RuntimeError::name(format!("module '{}' has no member '{name}'", module.name))
        })
      },
      | Value::Array(items) => intrinsics::array_member(items, name),
      | Value::String(text) => intrinsics::string_member(text, name),
      | other => Err(RuntimeError::type_error(format!(
        "cannot read property '{name}' of {}",
        other.type_name()
      ))),
    }
  }

  /// Calls any callable value with already evaluated arguments.
  #[async_recursion(?Send)]
  pub async fn call(
    &self,
    callee: &Value,
    positional: Vec<Value>,
    named: NamedArgs,
    range: Range,
  ) -> Result<Value, RuntimeError> {
    match callee {
      | Value::Function(Function::Native(native)) => {
        trace!(function = %native.name, "dispatching built-in");
        (native.func)(positional, named, self.context(range)).await
      },
      | Value::Function(Function::Closure(closure)) => {
        self.call_closure(closure, positional, named).await
      },
      | other => Err(RuntimeError::type_error(format!(
        "{} is not callable",
        other.type_name()
      ))),
    }
  }

  async fn call_closure(
    &self,
    closure: &Closure,
    positional: Vec<Value>,
    mut named: NamedArgs,
  ) -> Result<Value, RuntimeError> {
    let function = &closure.def;
    let name = function.name.as_deref().unwrap_or("anonymous");

    if self.depth.get() >= self.config.max_call_depth {
      return Err(RuntimeError::runtime(format!(
        "maximum call depth of {} exceeded in '{name}'",
        self.config.max_call_depth
      )));
    }

    let position = stack_position();

    if self.depth.get() == 0 {
      self.stack_base.set(position);
    } else if self.stack_base.get().abs_diff(position) > self.config.max_stack_bytes {
      return Err(RuntimeError::runtime(format!(
        "call stack exhausted after {} nested calls in '{name}'",
        self.depth.get()
      )));
    }

    let scope = Scope::push(&closure.scope, ScopeKind::Function);
    let mut positional = positional.into_iter();

    for param in &function.params {
      let by_position = positional.next();

      let value = match (named.remove(&param.name), by_position) {
        | (Some(value), _) | (None, Some(value)) => value,
        | (None, None) if param.default.is_some() => {
          return Err(
            RuntimeError::unsupported(format!(
              "default value of parameter '{}' is not supported",
              param.name
            ))
            .with_range(param.range),
          );
        },
        | (None, None) => Value::Null,
      };

      scope.declare(Store::L, &param.name, value)?;
    }

    if let Some(unknown) = named.keys().next() {
      return Err(RuntimeError::name(format!(
        "'{name}' has no parameter named '{unknown}'"
      )));
    }

    self.depth.set(self.depth.get() + 1);

    let result = match &function.body {
      | FunctionBody::Block(block) => match self.exec_statements(&block.body, &scope).await {
        | Ok(Completion::Return(value)) => Ok(value),
        | Ok(_) => Ok(Value::Null),
        | Err(error) => Err(error),
      },
      | FunctionBody::Expression(expression) => self.eval_expression(expression, &scope).await,
    };

    self.depth.set(self.depth.get() - 1);

    result
  }
}

/// Approximate address of the current stack frame.
#[inline(never)]
fn stack_position() -> usize {
  let marker = 0u8;
  std::hint::black_box(&marker) as *const u8 as usize
}

/// Text bound by `catch`: the thrown value for `throw`, the code and message otherwise.
fn caught_message(error: &RuntimeError) -> String {
  match error.code {
    | ErrorCode::Runtime => error.message.clone(),
    | _ => error.to_string(),
  }
}

fn describe(expression: &Expression) -> &'static str {
  match expression {
    | Expression::Call(..) => "a call",
    | Expression::Number(..) | Expression::String(..) | Expression::Boolean(..) | Expression::Null(..) => {
      "a literal"
    },
    | _ => "this expression",
  }
}

/// Elements visited by `forEach`: array items, characters of a string or keys of an object.
fn iterate(value: &Value) -> Result<Vec<Value>, RuntimeError> {
  match value {
    | Value::Array(items) => Ok(items.borrow().clone()),
    | Value::String(text) => Ok(text.chars().map(|ch| Value::String(ch.to_string())).collect()),
    | Value::Object(entries) => Ok(entries.borrow().keys().cloned().map(Value::String).collect()),
    | other => Err(RuntimeError::type_error(format!(
      "cannot iterate over {}",
      other.type_name()
    ))),
  }
}

fn array_index(index: &Value) -> Result<usize, RuntimeError> {
  match index {
    | Value::Number(number) if *number >= 0.0 && number.fract() == 0.0 => Ok(*number as usize),
    | other => Err(RuntimeError::type_error(format!(
      "invalid index {}",
      other.to_repr()
    ))),
  }
}

fn get_index(object: &Value, index: &Value) -> Result<Value, RuntimeError> {
  match object {
    | Value::Array(items) => {
      let index = array_index(index)?;

      Ok(items.borrow().get(index).cloned().unwrap_or(Value::Null))
    },
    | Value::String(text) => {
      let index = array_index(index)?;

      Ok(
        text
          .chars()
          .nth(index)
          .map(|ch| Value::String(ch.to_string()))
          .unwrap_or(Value::Null),
      )
    },
    | Value::Object(entries) => Ok(
      entries
        .borrow()
        .get(&index.to_display())
        .cloned()
        .unwrap_or(Value::Null),
    ),
    | other => Err(RuntimeError::type_error(format!(
      "cannot index {}",
      other.type_name()
    ))),
  }
}

/// Writing one past the end of an array appends.
fn set_index(object: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
  match object {
    | Value::Array(items) => {
      let position = array_index(index)?;
      let mut items = items.borrow_mut();

      match position.cmp(&items.len()) {
        | std::cmp::Ordering::Less => items[position] = value,
        | std::cmp::Ordering::Equal => items.push(value),
        | std::cmp::Ordering::Greater => {
          return Err(RuntimeError::type_error(format!(
            "index {position} is out of bounds for an array of length {}",
            items.len()
          )))
        },
      }

      Ok(())
    },
    | Value::Object(entries) => {
      entries.borrow_mut().insert(index.to_display(), value);
      Ok(())
    },
    | other => Err(RuntimeError::type_error(format!(
      "cannot index {}",
      other.type_name()
    ))),
  }
}

fn unary(op: UnaryOp, operand: &Value) -> Result<Value, RuntimeError> {
  match (op, operand) {
    | (UnaryOp::Not, operand) => Ok(Value::Boolean(!cast_to_boolean(operand, None))),
    | (UnaryOp::Negate, Value::Number(number)) => Ok(Value::Number(-number)),
    | (UnaryOp::Negate, other) => Err(RuntimeError::type_error(format!(
      "cannot negate {}",
      other.type_name()
    ))),
  }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
  let value = match (op, left, right) {
    | (BinaryOp::Equal | BinaryOp::StrictEqual, left, right) => Value::Boolean(deep_equal(left, right)),
    | (BinaryOp::NotEqual | BinaryOp::StrictNotEqual, left, right) => {
      Value::Boolean(!deep_equal(left, right))
    },
    | (BinaryOp::Add, Value::Number(left), Value::Number(right)) => Value::Number(left + right),
    | (BinaryOp::Add, Value::String(_), _) | (BinaryOp::Add, _, Value::String(_)) => {
      Value::String(format!("{}{}", left.to_display(), right.to_display()))
    },
    | (_, Value::Number(left), Value::Number(right)) => match op {
      | BinaryOp::Subtract => Value::Number(left - right),
      | BinaryOp::Multiply => Value::Number(left * right),
      | BinaryOp::Divide => Value::Number(left / right),
      | BinaryOp::Modulo => Value::Number(left % right),
      | BinaryOp::Power => Value::Number(left.powf(*right)),
      | BinaryOp::Less => Value::Boolean(left < right),
      | BinaryOp::LessEqual => Value::Boolean(left <= right),
      | BinaryOp::Greater => Value::Boolean(left > right),
      | BinaryOp::GreaterEqual => Value::Boolean(left >= right),
      | _ => return Err(operand_error(op, "number", "number")),
    },
    | (BinaryOp::Less, Value::String(left), Value::String(right)) => Value::Boolean(left < right),
    | (BinaryOp::LessEqual, Value::String(left), Value::String(right)) => Value::Boolean(left <= right),
    | (BinaryOp::Greater, Value::String(left), Value::String(right)) => Value::Boolean(left > right),
    | (BinaryOp::GreaterEqual, Value::String(left), Value::String(right)) => {
      Value::Boolean(left >= right)
    },
    | (op, left, right) => return Err(operand_error(op, left.type_name(), right.type_name())),
  };

  Ok(value)
}

fn operand_error(op: BinaryOp, left: &str, right: &str) -> RuntimeError {
  RuntimeError::type_error(format!("operator '{op}' cannot be applied to {left} and {right}"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::testing::*;

  #[tokio::test]
  async fn test_arithmetic() {
    assert_eq!(eval("1 + 2 * 3").await, Ok(Value::Number(7.0)));
    assert_eq!(eval("2 ^ 3 ^ 2").await, Ok(Value::Number(64.0)));
    assert_eq!(eval("7 % 4").await, Ok(Value::Number(3.0)));
    assert_eq!(eval("1.5s + 500ms").await, Ok(Value::Number(2000.0)));
    assert_eq!(eval("'n' + 1").await, Ok(Value::string("n1")));
    assert_eq!(eval("'b' > 'a'").await, Ok(Value::Boolean(true)));
    assert_eq!(error_code("1 - 'a'").await, ErrorCode::Type);
  }

  #[tokio::test]
  async fn test_logical() {
    assert_eq!(eval("0 || 'x'").await, Ok(Value::Boolean(true)));
    assert_eq!(eval("1 && null").await, Ok(Value::Boolean(false)));
    assert_eq!(eval("false && missing()").await, Ok(Value::Boolean(false)));
    assert_eq!(eval("!''").await, Ok(Value::Boolean(true)));
  }

  #[tokio::test]
  async fn test_boolean_ops() {
    assert_eq!(eval("'True' ?isBoolean").await, Ok(Value::Boolean(true)));
    assert_eq!(eval("'yes' ?isBoolean").await, Ok(Value::Boolean(false)));
    assert_eq!(eval("'yes' !isBoolean").await, Ok(Value::Boolean(true)));
    assert_eq!(eval("'false' ?isBoolean.t").await, Ok(Value::Boolean(false)));
    assert_eq!(eval("'false' ?isBoolean.f").await, Ok(Value::Boolean(true)));
    assert_eq!(eval("0 isBoolean").await, Ok(Value::Boolean(false)));
    assert_eq!(eval("0 isBoolean.t").await, Ok(Value::Boolean(true)));
  }

  #[tokio::test]
  async fn test_collections() {
    let output = run(indoc::indoc! {"
      let items = [1, 2]
      let alias = items
      alias.push(3)
      items[3] = 4
      let point = { x: 1 }
      point.y = 2
      point['z'] = 3
      print(items, items.length, point, point.missing)
    "})
    .await;

    assert_eq!(output, vec!["[1, 2, 3, 4] 4 { x: 1, y: 2, z: 3 } null"]);
  }

  #[tokio::test]
  async fn test_array_containing_itself() {
    let output = run(indoc::indoc! {"
      let a = [1]
      a.push(a)
      print(len(a))
      print(a)
      print(a == a, a.join('-'))
    "})
    .await;

    assert_eq!(output, vec!["2", "[1, [...]]", "true 1-[1, [...]]"]);
  }

  #[tokio::test]
  async fn test_index_errors() {
    assert_eq!(error_code("let a = [1]\na[5] = 1").await, ErrorCode::Type);
    assert_eq!(error_code("let a = [1]\na[-1]").await, ErrorCode::Type);
    assert_eq!(error_code("let n = 1\nn.x").await, ErrorCode::Type);
    assert_eq!(eval("[1, 2][7]").await, Ok(Value::Null));
    assert_eq!(eval("'abc'[1]").await, Ok(Value::string("b")));
  }

  #[tokio::test]
  async fn test_function_calls() {
    let output = run(indoc::indoc! {"
      print(add(1, 2))
      func add(a, b) {
        return a + b
      }
      let greet = (name, punct) => 'hi ' + name + punct
      print(greet(punct: '!', name: 'bo'))
      func nothing(a) {
        print(a)
      }
      print(nothing())
    "})
    .await;

    assert_eq!(output, vec!["3", "hi bo!", "null", "null"]);
  }

  #[tokio::test]
  async fn test_closures_share_scope() {
    let output = run(indoc::indoc! {"
      func counter() {
        let count = 0
        return () => {
          count = count + 1
          return count
        }
      }
      let next = counter()
      next()
      print(next())
    "})
    .await;

    assert_eq!(output, vec!["2"]);
  }

  #[tokio::test]
  async fn test_call_errors() {
    assert_eq!(error_code("func f(a = 1) {}\nf()").await, ErrorCode::Unsupported);
    assert_eq!(error_code("func f(a) {}\nf(b: 1)").await, ErrorCode::Name);
    assert_eq!(error_code("let x = 1\nx()").await, ErrorCode::Type);
  }

  #[tokio::test]
  async fn test_call_depth() {
    let config = RuntimeConfig {
      max_call_depth: 16,
      ..RuntimeConfig::default()
    };

    let (result, _) = run_with_config("func f(n) { return f(n + 1) }\nf(0)", config).await;
    let error = result.unwrap_err();

    assert_eq!(error.code, ErrorCode::Runtime);
    assert!(error.message.contains("maximum call depth of 16"));
  }

  #[tokio::test]
  async fn test_unbounded_recursion_with_default_limits() {
    let code = "func f(n) {\n  if n == -1 { return 0 }\n  return 1 + f(n + 1)\n}\nprint(f(0))";
    let (result, output) = run_result(code).await;

    assert_eq!(result.map_err(|error| error.code), Err(ErrorCode::Runtime));
    assert!(output.is_empty());
  }

  #[tokio::test]
  async fn test_default_is_fine_when_argument_given() {
    assert_eq!(eval("func f(a = 1) { return a }\nf(5)").await, Ok(Value::Number(5.0)));
  }

  #[tokio::test]
  async fn test_loops() {
    let output = run(indoc::indoc! {"
      let total = 0
      for (let i = 0; i < 10; i = i + 1) {
        if i == 2 { continue }
        if i == 5 { break }
        total = total + i
      }
      print(total)
      let n = 0
      while n < 3 {
        n = n + 1
      }
      print(n)
      forEach (ch in 'ab') { print(ch) }
      let table = { b: 1, a: 2 }
      forEach key in table { print(key) }
    "})
    .await;

    assert_eq!(output, vec!["8", "3", "a", "b", "a", "b"]);
  }

  #[tokio::test]
  async fn test_fresh_scope_per_iteration() {
    let output = run(indoc::indoc! {"
      forEach (x in [1, 2]) {
        let doubled = x * 2
        print(doubled)
      }
    "})
    .await;

    assert_eq!(output, vec!["2", "4"]);
  }

  #[tokio::test]
  async fn test_return_from_loop() {
    let output = run(indoc::indoc! {"
      func find(items) {
        forEach (item in items) {
          if item > 1 { return item }
        }
        return null
      }
      print(find([1, 5, 9]))
    "})
    .await;

    assert_eq!(output, vec!["5"]);
  }

  #[tokio::test]
  async fn test_try_catch_finally() {
    let output = run(indoc::indoc! {"
      try {
        throw 'boom'
      } catch (e) {
        print('caught ' + e)
      } finally {
        print('done')
      }
      try {
        missing
      } catch {
        print(error)
      }
    "})
    .await;

    assert_eq!(output, vec!["caught boom", "done", "E_NAME: 'missing' is not defined"]);
  }

  #[tokio::test]
  async fn test_finally_overrides() {
    let source = indoc::indoc! {"
      func f() {
        try {
          return 1
        } finally {
          return 2
        }
      }
      f()
    "};

    assert_eq!(eval(source).await, Ok(Value::Number(2.0)));

    let source = indoc::indoc! {"
      func g() {
        try {
          throw 'first'
        } finally {
          print('cleanup')
        }
      }
      g()
    "};

    let (result, output) = run_result(source).await;
    assert_eq!(result.map_err(|error| error.message), Err("first".to_string()));
    assert_eq!(output, vec!["cleanup"]);
  }

  #[tokio::test]
  async fn test_break_is_not_caught() {
    let output = run(indoc::indoc! {"
      let i = 0
      while true {
        try {
          break
        } catch {
          print('never')
        } finally {
          print('finally')
        }
      }
      print('after')
    "})
    .await;

    assert_eq!(output, vec!["finally", "after"]);
  }

  #[tokio::test]
  async fn test_top_level_return() {
    let (result, output) = run_result("print(1)\nreturn 5\nprint(2)").await;

    assert_eq!(result, Ok(Value::Number(5.0)));
    assert_eq!(output, vec!["1"]);
  }

  #[tokio::test]
  async fn test_qualified_stores() {
    let output = run(indoc::indoc! {"
      let x = 1
      var y = 2
      const z = 3
      l.x = 10
      v.y = 20
      print(l.x, v.y, c.z, x)
    "})
    .await;

    assert_eq!(output, vec!["10 20 3 10"]);
    assert_eq!(error_code("l.fresh = 1").await, ErrorCode::Name);
    assert_eq!(error_code("let x = 1\nv.x").await, ErrorCode::Name);
  }

  #[tokio::test]
  async fn test_auto_declare_qualified_writes() {
    let config = RuntimeConfig {
      auto_declare_qualified_writes: true,
      ..RuntimeConfig::default()
    };

    let (result, output) = run_with_config("l.fresh = 1\nprint(l.fresh)", config).await;

    assert!(result.is_ok());
    assert_eq!(output, vec!["1"]);
  }

  #[tokio::test]
  async fn test_error_range() {
    let (result, _) = run_result("let a = 1\nlet b = a + missing").await;
    let error = result.unwrap_err();

    assert_eq!(error.code, ErrorCode::Name);
    assert_eq!(error.range.map(|range| range.start.line), Some(2));
    assert_eq!(error.range.map(|range| range.start.column), Some(13));
  }
}

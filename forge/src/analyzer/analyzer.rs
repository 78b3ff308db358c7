use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tracing::debug;

use super::context::*;
use super::ForgeType;
use crate::ast::traverser::{self, Node};
use crate::ast::*;
use crate::errors::Diagnostic;
use crate::intrinsics;
use crate::modules::{self, ModuleContext, ALL_IN_ONE};
use crate::source::Range;

#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
  /// Unknown properties of object literals are warnings instead of errors.
  pub relaxed_member_access: bool,
  /// Extra global names provided by the host, e.g. registered modules.
  pub globals: BTreeSet<String>,
}

impl Default for AnalyzerOptions {
  fn default() -> Self {
    AnalyzerOptions {
      relaxed_member_access: true,
      globals: BTreeSet::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleReport {
  /// Module context after every top-level directive.
  pub context: ModuleContext,
  /// Capability modules the program refers to.
  pub referenced: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
  pub diagnostics: Vec<Diagnostic>,
  pub symbols: Vec<Symbol>,
  pub modules: ModuleReport,
  pub types: BTreeMap<Range, ForgeType>,
}

impl AnalysisOutput {
  pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
    self.diagnostics.iter().filter(|diagnostic| diagnostic.is_error())
  }

  pub fn has_errors(&self) -> bool {
    self.errors().next().is_some()
  }
}

pub fn analyze_program(program: &Program, options: AnalyzerOptions) -> AnalysisOutput {
  Analyzer::new(options).analyze(program)
}

/// Capability modules referenced as the root of a member access or call.
fn referenced_modules(program: &Program) -> BTreeSet<String> {
  let mut referenced = BTreeSet::new();

  traverser::traverse_program(&mut referenced, program, &|set, node| {
    if let Node::Expression(Expression::Member(_, object, _) | Expression::Call(_, object, _)) = node {
      if let Expression::Identifier(_, name) = object.as_ref() {
        if modules::is_capability_module(name) {
          set.insert(name.clone());
        }
      }
    }
  });

  referenced
}

/// Return type of a call to a built-in global.
fn intrinsic_return_type(name: &str) -> ForgeType {
  match name {
    | "inp" | "str" | "type" => ForgeType::String,
    | "len" | "num" | "random" => ForgeType::Number,
    | "print" => ForgeType::Void,
    | _ => ForgeType::Unknown,
  }
}

fn member_type(receiver: &ForgeType, name: &str) -> Option<ForgeType> {
  let ty = match (receiver, name) {
    | (ForgeType::Array(_), "length") | (ForgeType::String, "length") => ForgeType::Number,
    | (ForgeType::Array(_), "push") => ForgeType::function(1, 1, ForgeType::Number),
    | (ForgeType::Array(element), "pop") => ForgeType::function(0, 0, *element.clone()),
    | (ForgeType::Array(_), "join") => ForgeType::function(1, 0, ForgeType::String),
    | (ForgeType::Array(_), "includes") | (ForgeType::String, "includes") => {
      ForgeType::function(1, 1, ForgeType::Boolean)
    },
    | (ForgeType::String, "upper" | "lower" | "trim") => ForgeType::function(0, 0, ForgeType::String),
    | (ForgeType::String, "split") => {
      ForgeType::function(1, 0, ForgeType::array(ForgeType::String))
    },
    | _ => return None,
  };

  Some(ty)
}

fn function_type(function: &FunctionDef) -> ForgeType {
  let required = function
    .params
    .iter()
    .filter(|param| param.default.is_none())
    .count();

  let returns = match &function.body {
    | FunctionBody::Block(block) if !returns_value(&block.body) => ForgeType::Void,
    | _ => ForgeType::Unknown,
  };

  ForgeType::function(function.params.len(), required, returns)
}

/// Whether a `return` with a value is reachable in `body`, nested functions aside.
fn returns_value(body: &[Statement]) -> bool {
  body.iter().any(|statement| match statement {
    | Statement::Return(_, value) => value.is_some(),
    | Statement::If(_, statement) => {
      returns_value(&statement.consequent.body)
        || statement
          .elifs
          .iter()
          .any(|clause| returns_value(&clause.consequent.body))
        || statement
          .alternate
          .as_ref()
          .map_or(false, |alternate| returns_value(&alternate.body))
    },
    | Statement::While(_, _, body) | Statement::ForEach(_, _, _, body) => returns_value(&body.body),
    | Statement::For(_, statement) => returns_value(&statement.body.body),
    | Statement::Try(_, statement) => {
      returns_value(&statement.block.body)
        || statement
          .handler
          .as_ref()
          .map_or(false, |handler| returns_value(&handler.body.body))
        || statement
          .finalizer
          .as_ref()
          .map_or(false, |finalizer| returns_value(&finalizer.body))
    },
    | Statement::Block(block) => returns_value(&block.body),
    | _ => false,
  })
}

pub struct Analyzer {
  context: Context,
  options: AnalyzerOptions,
  diagnostics: Vec<Diagnostic>,
  types: BTreeMap<Range, ForgeType>,
}

impl Analyzer {
  pub fn new(options: AnalyzerOptions) -> Self {
    Analyzer {
      context: Context::new(),
      options,
      diagnostics: vec![],
      types: BTreeMap::new(),
    }
  }

  pub fn analyze(mut self, program: &Program) -> AnalysisOutput {
    // Directives apply to the whole program, wherever they appear at the top level.
    for statement in program.body.iter().filter(|statement| statement.is_directive()) {
      self.check_directive(statement);
      self.context.modules.apply(statement);
    }

    let referenced = referenced_modules(program);

    self.analyze_statements(&program.body);
    self.flush_deferred();

    let mut diagnostics = self.diagnostics;
    diagnostics.sort_by_key(|diagnostic| diagnostic.range.start.offset);

    debug!(
      diagnostics = diagnostics.len(),
      modules = referenced.len(),
      "analyzed program"
    );

    AnalysisOutput {
      diagnostics,
      modules: ModuleReport {
        context: self.context.modules.clone(),
        referenced,
      },
      symbols: self.context.into_symbols(),
      types: self.types,
    }
  }

  // Diagnostics.

  fn error(&mut self, code: &'static str, message: String, range: Range) {
    self.diagnostics.push(Diagnostic::error(code, message, range));
  }

  fn warning(&mut self, code: &'static str, message: String, range: Range) {
    self.diagnostics.push(Diagnostic::warning(code, message, range));
  }

  fn info(&mut self, code: &'static str, message: String, range: Range) {
    self.diagnostics.push(Diagnostic::info(code, message, range));
  }

  fn check_directive(&mut self, statement: &Statement) {
    if let Statement::Able(range, names) = statement {
      for name in names {
        if name != ALL_IN_ONE && !modules::is_capability_module(name) && !self.options.globals.contains(name) {
          self.warning(
            "SEM_UNKNOWN_MODULE",
            format!("unknown module '{name}'"),
            *range,
          );
        }
      }
    }
  }

  // Scopes.

  fn scoped<F>(&mut self, kind: ScopeKind, func: F)
  where
    F: FnOnce(&mut Self),
  {
    self.context.enter_scope(kind);
    func(self);
    self.flush_deferred();
    self.context.exit_scope();
  }

  fn flush_deferred(&mut self) {
    loop {
      let deferred = self.context.take_deferred();

      if deferred.is_empty() {
        break;
      }

      deferred
        .iter()
        .for_each(|function| self.analyze_function(function));
    }
  }

  fn declare(&mut self, symbol: Symbol) -> Option<usize> {
    let range = symbol.range;
    let name = symbol.name.clone();

    match self.context.declare(symbol) {
      | Ok(index) => Some(index),
      | Err(existing) => {
        let previous = self.context.symbol(existing).range;

        self.error(
          "SEM_REDECLARED",
          format!("'{name}' is already declared in this scope at {previous}"),
          range,
        );

        None
      },
    }
  }

  fn analyze_function(&mut self, function: &Rc<FunctionDef>) {
    let loop_depth = self.context.enter_function();

    self.scoped(ScopeKind::Function, |analyzer| {
      for param in &function.params {
        if let Some(default) = &param.default {
          analyzer.analyze_expression(default);
          analyzer.warning(
            "SEM_UNSUPPORTED_DEFAULT",
            format!("default value of '{}' is not supported when called", param.name),
            default.get_range(),
          );
        }

        analyzer.declare(Symbol::new(
          &param.name,
          SymbolKind::Parameter,
          None,
          ForgeType::Unknown,
          param.range,
        ));
      }

      match &function.body {
        | FunctionBody::Block(block) => analyzer.analyze_statements(&block.body),
        | FunctionBody::Expression(expression) => {
          analyzer.analyze_expression(expression);
        },
      }
    });

    self.context.exit_function(loop_depth);
  }

  // Statements.

  /// Function declarations are visible from the start of their block.
  fn analyze_statements(&mut self, body: &[Statement]) {
    for statement in body {
      if let Statement::FunctionDeclaration(range, function) = statement {
        let name = function.name.clone().unwrap_or_default();

        self.declare(Symbol::new(
          &name,
          SymbolKind::Function,
          None,
          function_type(function),
          *range,
        ));
      }
    }

    body
      .iter()
      .for_each(|statement| self.analyze_statement(statement));
  }

  fn analyze_block(&mut self, block: &Block) {
    self.scoped(ScopeKind::Block, |analyzer| {
      analyzer.analyze_statements(&block.body)
    });
  }

  fn analyze_loop_body(&mut self, block: &Block) {
    self.context.enter_loop();
    self.analyze_block(block);
    self.context.exit_loop();
  }

  fn analyze_statement(&mut self, statement: &Statement) {
    match statement {
      | Statement::VariableDeclaration(range, kind, name, value) => {
        let ty = value
          .as_ref()
          .map(|value| self.analyze_expression(value))
          .unwrap_or(ForgeType::Null);

        self.declare(Symbol::new(
          name,
          SymbolKind::Variable,
          Some(kind.store()),
          ty,
          *range,
        ));
      },
      | Statement::Assignment(_, target, value) => {
        let ty = self.analyze_expression(value);
        self.analyze_assignment(target, ty);
      },
      | Statement::Expression(_, expression) => {
        self.analyze_expression(expression);
      },
      | Statement::FunctionDeclaration(_, function) => self.context.defer(Rc::clone(function)),
      | Statement::Return(range, value) => {
        if let Some(value) = value {
          self.analyze_expression(value);
        }

        if !self.context.in_function() {
          self.info(
            "SEM_TOP_LEVEL_RETURN",
            "'return' outside of a function ends the program".to_string(),
            *range,
          );
        }
      },
      | Statement::If(_, statement) => {
        self.analyze_expression(&statement.test);
        self.analyze_block(&statement.consequent);

        for clause in &statement.elifs {
          self.analyze_expression(&clause.test);
          self.analyze_block(&clause.consequent);
        }

        if let Some(alternate) = &statement.alternate {
          self.analyze_block(alternate);
        }
      },
      | Statement::While(_, test, body) => {
        self.analyze_expression(test);
        self.analyze_loop_body(body);
      },
      | Statement::For(_, statement) => self.scoped(ScopeKind::Block, |analyzer| {
        if let Some(init) = &statement.init {
          analyzer.analyze_statement(init);
        }

        if let Some(test) = &statement.test {
          analyzer.analyze_expression(test);
        }

        analyzer.analyze_loop_body(&statement.body);

        if let Some(update) = &statement.update {
          analyzer.analyze_statement(update);
        }
      }),
      | Statement::ForEach(range, name, iterable, body) => {
        let element = match self.analyze_expression(iterable) {
          | ForgeType::Array(element) => *element,
          | ForgeType::String | ForgeType::Object { .. } => ForgeType::String,
          | ForgeType::Unknown => ForgeType::Unknown,
          | other => {
            self.warning(
              "SEM_TYPE_MISMATCH",
              format!("cannot iterate over {other}"),
              iterable.get_range(),
            );

            ForgeType::Unknown
          },
        };

        self.scoped(ScopeKind::Block, |analyzer| {
          analyzer.declare(Symbol::new(
            name,
            SymbolKind::LoopVariable,
            None,
            element,
            *range,
          ));

          analyzer.analyze_loop_body(body);
        });
      },
      | Statement::Break(range) | Statement::Continue(range) => {
        if !self.context.in_loop() {
          let keyword = match statement {
            | Statement::Break(_) => "break",
            | _ => "continue",
          };

          self.error(
            "SEM_INVALID_JUMP",
            format!("'{keyword}' outside of a loop"),
            *range,
          );
        }
      },
      | Statement::Try(_, statement) => {
        self.analyze_block(&statement.block);

        if let Some(handler) = &statement.handler {
          self.scoped(ScopeKind::Block, |analyzer| {
            analyzer.declare(Symbol::new(
              &handler.param,
              SymbolKind::CatchBinding,
              None,
              ForgeType::String,
              handler.range,
            ));

            analyzer.analyze_statements(&handler.body.body);
          });
        }

        if let Some(finalizer) = &statement.finalizer {
          self.analyze_block(finalizer);
        }
      },
      | Statement::Throw(_, value) => {
        self.analyze_expression(value);
      },
      | Statement::Block(block) => self.analyze_block(block),
      | Statement::Disable(range, _) | Statement::Able(range, _) => {
        if !self.context.is_global() {
          self.warning(
            "SEM_NESTED_DIRECTIVE",
            "directives only take effect at the top level of a program".to_string(),
            *range,
          );
        }
      },
    }
  }

  fn analyze_assignment(&mut self, target: &Expression, ty: ForgeType) {
    match target {
      | Expression::Identifier(range, name) => match self.context.resolve(name) {
        | Some(index) => {
          let symbol = self.context.symbol(index).clone();

          if symbol.is_const() {
            self.error(
              "SEM_CONST_ASSIGN",
              format!("cannot reassign constant '{name}'"),
              *range,
            );
          } else if !symbol.ty.holds_no_value() && !ty.is_assignable_to(&symbol.ty) {
            self.warning(
              "SEM_TYPE_MISMATCH",
              format!("'{name}' holds {}, but is assigned {ty}", symbol.ty),
              *range,
            );
          }

          let ty = match symbol.ty {
            | previous if previous.holds_no_value() => ty,
            | previous => previous.join(&ty),
          };

          self.types.insert(*range, ty.clone());
          self.context.set_type(index, ty);
        },
        | None => self.error(
          "SEM_UNDEFINED",
          format!("'{name}' is not defined"),
          *range,
        ),
      },
      | Expression::Namespaced(range, store, name) => {
        if *store == Store::C {
          self.error(
            "SEM_CONST_ASSIGN",
            format!("cannot assign to constant 'c.{name}'"),
            *range,
          );
        }

        match self.context.resolve_in_store(*store, name) {
          | Some(index) => {
            let joined = self.context.symbol(index).ty.join(&ty);
            self.context.set_type(index, joined);
          },
          | None if *store != Store::C => {
            self.context.declare_in_store(
              *store,
              Symbol::new(name, SymbolKind::Variable, Some(*store), ty.clone(), *range),
            );
          },
          | None => {},
        }

        self.types.insert(*range, ty);
      },
      | Expression::Member(_, object, _) => {
        self.analyze_expression(object);
      },
      | Expression::Index(_, object, index) => {
        self.analyze_expression(object);
        self.analyze_expression(index);
      },
      | other => {
        self.analyze_expression(other);
      },
    }
  }

  // Expressions.

  fn analyze_expression(&mut self, expression: &Expression) -> ForgeType {
    let ty = self.infer(expression);

    self.types.insert(expression.get_range(), ty.clone());
    ty
  }

  /// Capability module named by `expression`, unless a local binding shadows it.
  fn module_name<'e>(&self, expression: &'e Expression) -> Option<&'e str> {
    match expression {
      | Expression::Identifier(_, name)
        if modules::is_capability_module(name) && self.context.resolve(name).is_none() =>
      {
        Some(name)
      },
      | _ => None,
    }
  }

  fn check_module(&mut self, module: &str, range: Range) {
    if !self.context.modules.is_enabled(module) {
      self.error(
        "SEM_MODULE_DISABLED",
        format!("module '{module}' is disabled; enable it with able '{module}'"),
        range,
      );
    }
  }

  fn infer(&mut self, expression: &Expression) -> ForgeType {
    match expression {
      | Expression::Number(..) => ForgeType::Number,
      | Expression::String(..) => ForgeType::String,
      | Expression::Template(_, parts) => {
        for part in parts {
          if let TemplatePart::Expression(expression) = part {
            self.analyze_expression(expression);
          }
        }

        ForgeType::String
      },
      | Expression::Duration(..) => ForgeType::Duration,
      | Expression::Boolean(..) => ForgeType::Boolean,
      | Expression::Null(_) => ForgeType::Null,
      | Expression::Identifier(range, name) => self.infer_identifier(name, *range),
      | Expression::Namespaced(range, store, name) => {
        match self.context.resolve_in_store(*store, name) {
          | Some(index) => self.context.symbol(index).ty.clone(),
          | None => {
            self.error(
              "SEM_UNDEFINED",
              format!("'{store}.{name}' is not defined"),
              *range,
            );

            ForgeType::Unknown
          },
        }
      },
      | Expression::Array(_, items) => {
        let element = items
          .iter()
          .map(|item| self.analyze_expression(item))
          .reduce(|left, right| left.join(&right))
          .unwrap_or(ForgeType::Never);

        ForgeType::array(element)
      },
      | Expression::Object(_, properties) => {
        let properties = properties
          .iter()
          .map(|property| (property.key.clone(), self.analyze_expression(&property.value)))
          .collect();

        ForgeType::Object {
          properties,
          open: true,
        }
      },
      | Expression::Member(range, object, name) => {
        if let Some(module) = self.module_name(object) {
          self.check_module(module, *range);
          return self.module_member_type(module);
        }

        let receiver = self.analyze_expression(object);
        self.infer_member(&receiver, name, *range)
      },
      | Expression::Index(_, object, index) => {
        let receiver = self.analyze_expression(object);
        self.analyze_expression(index);

        match receiver {
          | ForgeType::Array(element) => *element,
          | ForgeType::String => ForgeType::String,
          | _ => ForgeType::Unknown,
        }
      },
      | Expression::Call(range, callee, arguments) => self.infer_call(callee, arguments, *range),
      | Expression::Unary(range, op, operand) => {
        let ty = self.analyze_expression(operand);

        match op {
          | UnaryOp::Not => ForgeType::Boolean,
          | UnaryOp::Negate => match ty {
            | ForgeType::Duration => ForgeType::Duration,
            | ForgeType::Number | ForgeType::Unknown => ForgeType::Number,
            | other => {
              self.warning(
                "SEM_TYPE_MISMATCH",
                format!("cannot negate {other}"),
                *range,
              );

              ForgeType::Number
            },
          },
        }
      },
      | Expression::Binary(range, op, left, right) => {
        let left = self.analyze_expression(left);
        let right = self.analyze_expression(right);

        self.infer_binary(*op, &left, &right, *range)
      },
      | Expression::Logical(_, _, left, right) => {
        self.analyze_expression(left);
        self.analyze_expression(right);

        ForgeType::Boolean
      },
      | Expression::Arrow(_, function) => {
        self.context.defer(Rc::clone(function));
        function_type(function)
      },
      | Expression::BooleanOp(_, op) => {
        self.analyze_expression(&op.subject);
        ForgeType::Boolean
      },
    }
  }

  fn infer_identifier(&mut self, name: &str, range: Range) -> ForgeType {
    if let Some(index) = self.context.resolve(name) {
      return self.context.symbol(index).ty.clone();
    }

    if modules::is_capability_module(name) {
      return ForgeType::Module(name.to_string());
    }

    if intrinsics::is_global(name) {
      return ForgeType::Unknown;
    }

    if self.options.globals.contains(name) {
      return ForgeType::Module(name.to_string());
    }

    self.error("SEM_UNDEFINED", format!("'{name}' is not defined"), range);
    ForgeType::Unknown
  }

  fn infer_member(&mut self, receiver: &ForgeType, name: &str, range: Range) -> ForgeType {
    if let Some(ty) = member_type(receiver, name) {
      return ty;
    }

    match receiver {
      | ForgeType::Object { properties, open } => match properties.get(name) {
        | Some(ty) => ty.clone(),
        | None => {
          let message = format!("property '{name}' does not exist on {receiver}");

          if *open && self.options.relaxed_member_access {
            self.warning("SEM_UNKNOWN_PROPERTY", message, range);
          } else {
            self.error("SEM_UNKNOWN_PROPERTY", message, range);
          }

          ForgeType::Unknown
        },
      },
      | ForgeType::Array(_) | ForgeType::String => {
        let message = format!("{receiver} has no property '{name}'");

        if self.options.relaxed_member_access {
          self.warning("SEM_UNKNOWN_PROPERTY", message, range);
        } else {
          self.error("SEM_UNKNOWN_PROPERTY", message, range);
        }

        ForgeType::Unknown
      },
      | ForgeType::Null | ForgeType::Boolean | ForgeType::Number | ForgeType::Duration => {
        self.warning(
          "SEM_TYPE_MISMATCH",
          format!("cannot read property '{name}' of {receiver}"),
          range,
        );

        ForgeType::Unknown
      },
      | ForgeType::Module(module) => self.module_member_type(module),
      | ForgeType::Any => ForgeType::Any,
      | _ => ForgeType::Unknown,
    }
  }

  /// Members of host-registered modules are untyped; built-in modules are simply not modelled.
  fn module_member_type(&self, module: &str) -> ForgeType {
    if self.options.globals.contains(module) {
      ForgeType::Any
    } else {
      ForgeType::Unknown
    }
  }

  fn infer_call(&mut self, callee: &Expression, arguments: &[Argument], range: Range) -> ForgeType {
    let module = self.module_name(callee).map(str::to_string);

    let callee_type = match module {
      | Some(module) => {
        self.check_module(&module, range);
        self.module_member_type(&module)
      },
      | None => self.analyze_expression(callee),
    };

    for argument in arguments {
      self.analyze_expression(argument.value());
    }

    match callee_type {
      | ForgeType::Function {
        params,
        required,
        returns,
      } => {
        let count = arguments.len();

        if count > params {
          self.warning(
            "SEM_ARGUMENT_MISMATCH",
            format!("expected at most {params} argument(s), found {count}"),
            range,
          );
        } else if count < required {
          self.warning(
            "SEM_ARGUMENT_MISMATCH",
            format!("expected at least {required} argument(s), found {count}"),
            range,
          );
        }

        *returns
      },
      | ForgeType::Unknown => match callee {
        | Expression::Identifier(_, name) if self.context.resolve(name).is_none() => {
          intrinsic_return_type(name)
        },
        | _ => ForgeType::Unknown,
      },
      | ForgeType::Module(_) => ForgeType::Unknown,
      | ForgeType::Any => ForgeType::Any,
      | other if !other.is_callable() => {
        self.warning(
          "SEM_NOT_CALLABLE",
          format!("{other} is not callable"),
          callee.get_range(),
        );

        ForgeType::Unknown
      },
      | _ => ForgeType::Unknown,
    }
  }

  fn infer_binary(&mut self, op: BinaryOp, left: &ForgeType, right: &ForgeType, range: Range) -> ForgeType {
    if !op.is_arithmetic() {
      return ForgeType::Boolean;
    }

    if op == BinaryOp::Add && (*left == ForgeType::String || *right == ForgeType::String) {
      return ForgeType::String;
    }

    if *left == ForgeType::Duration || *right == ForgeType::Duration {
      return match op {
        | BinaryOp::Add | BinaryOp::Subtract => ForgeType::Duration,
        | _ => {
          self.warning(
            "SEM_DURATION_OPERATOR",
            format!("operator '{op}' on a duration yields a plain number"),
            range,
          );

          ForgeType::Number
        },
      };
    }

    for side in [left, right] {
      if !side.is_numeric() && !side.is_unconstrained() {
        self.warning(
          "SEM_TYPE_MISMATCH",
          format!("operator '{op}' expects numbers, found {side}"),
          range,
        );
      }
    }

    ForgeType::Number
  }
}

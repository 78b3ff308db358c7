//! Testing utilities for parser(s).

use super::combinators;
use super::parser::{parse_source, ParseOutput};
use crate::ast::*;
use crate::errors::*;
use crate::lexer::{tokenize, LexerOptions};
use crate::source::{Input, SourceCode};

pub fn input_of(code: &str) -> Input {
  let source = SourceCode::from_str(code);
  let lexed = tokenize(&source, LexerOptions::default());
  let errors = lexed.errors.into_iter().map(ParseError::from).collect();

  Input::with_errors(source, lexed.tokens, errors)
}

pub fn parse(code: &str) -> ParseOutput {
  parse_source(&SourceCode::from_str(code))
}

pub fn codes(output: &ParseOutput) -> Vec<&'static str> {
  output.errors.iter().map(ParseError::code).collect()
}

/// Parses the whole of `code` with `func` and renders the result in a compact form.
pub fn shape<F>(func: F, code: &str) -> String
where
  F: Fn(Input) -> Result<(Expression, Input), ParseError>,
{
  match combinators::complete(&func, input_of(code)) {
    | Ok((expression, input)) => {
      assert!(input.errors().is_empty(), "{:?}", input.errors());
      render(&expression)
    },
    | Err(error) => panic!("failed to parse '{code}': {error}"),
  }
}

/// Renders every top-level statement; fails on any parse error.
pub fn statements(code: &str) -> Vec<String> {
  let output = parse(code);

  assert!(output.errors.is_empty(), "{:?}", output.errors);
  render_program(&output.program)
}

pub fn render_program(program: &Program) -> Vec<String> {
  program.body.iter().map(render_statement).collect()
}

fn block(block: &Block) -> String {
  format!("{{{}}}", block.body.len())
}

fn list<T>(items: &[T], func: fn(&T) -> String) -> String {
  items.iter().map(func).collect::<Vec<_>>().join(", ")
}

fn param(param: &Param) -> String {
  match &param.default {
    | Some(default) => format!("{} = {}", param.name, render(default)),
    | None => param.name.clone(),
  }
}

fn argument(argument: &Argument) -> String {
  match argument {
    | Argument::Positional(value) => render(value),
    | Argument::Named(_, name, value) => format!("{name}: {}", render(value)),
  }
}

fn function_body(body: &FunctionBody) -> String {
  match body {
    | FunctionBody::Block(body) => block(body),
    | FunctionBody::Expression(expression) => render(expression),
  }
}

pub fn render(expression: &Expression) -> String {
  match expression {
    | Expression::Number(_, value) => format!("{value}"),
    | Expression::String(_, value) => format!("{value:?}"),
    | Expression::Template(_, parts) => {
      let body = parts
        .iter()
        .map(|part| match part {
          | TemplatePart::Text(text) => text.clone(),
          | TemplatePart::Expression(expression) => format!("${{{}}}", render(expression)),
        })
        .collect::<String>();

      format!("`{body}`")
    },
    | Expression::Duration(_, duration) => format!("{}ms", duration.millis()),
    | Expression::Boolean(_, value) => format!("{value}"),
    | Expression::Null(_) => "null".to_string(),
    | Expression::Identifier(_, name) => name.clone(),
    | Expression::Namespaced(_, store, name) => format!("{store}.{name}"),
    | Expression::Array(_, items) => format!("[{}]", list(items, render)),
    | Expression::Object(_, properties) => {
      let body = properties
        .iter()
        .map(|property| format!("{}: {}", property.key, render(&property.value)))
        .collect::<Vec<_>>()
        .join(", ");

      format!("{{{body}}}")
    },
    | Expression::Member(_, object, name) => format!("{}.{name}", render(object)),
    | Expression::Index(_, object, index) => format!("{}[{}]", render(object), render(index)),
    | Expression::Call(_, callee, arguments) => {
      format!("{}({})", render(callee), list(arguments, argument))
    },
    | Expression::Unary(_, op, operand) => format!("({op}{})", render(operand)),
    | Expression::Binary(_, op, left, right) => {
      format!("({} {op} {})", render(left), render(right))
    },
    | Expression::Logical(_, op, left, right) => {
      format!("({} {op} {})", render(left), render(right))
    },
    | Expression::Arrow(_, function) => format!(
      "{}({}) => {}",
      if function.is_async { "async " } else { "" },
      list(&function.params, param),
      function_body(&function.body)
    ),
    | Expression::BooleanOp(_, op) => {
      let operator = match (op.kind, op.negate) {
        | (BooleanOpKind::Cast, _) => "isBoolean",
        | (BooleanOpKind::Query, true) => "!isBoolean",
        | (BooleanOpKind::Query, false) => "?isBoolean",
      };

      let suffix = match op.force {
        | Some(true) => ".t",
        | Some(false) => ".f",
        | None => "",
      };

      format!("({} {operator}{suffix})", render(&op.subject))
    },
  }
}

fn optional_statement(statement: &Option<Box<Statement>>) -> String {
  statement
    .as_ref()
    .map(|statement| render_statement(statement))
    .unwrap_or_default()
}

pub fn render_statement(statement: &Statement) -> String {
  match statement {
    | Statement::VariableDeclaration(_, kind, name, value) => match value {
      | Some(value) => format!("{kind} {name} = {}", render(value)),
      | None => format!("{kind} {name}"),
    },
    | Statement::Assignment(_, target, value) => format!("{} = {}", render(target), render(value)),
    | Statement::Expression(_, expression) => render(expression),
    | Statement::FunctionDeclaration(_, function) => format!(
      "{}func {}({}) {}",
      if function.is_async { "async " } else { "" },
      function.name.clone().unwrap_or_default(),
      list(&function.params, param),
      function_body(&function.body)
    ),
    | Statement::Return(_, value) => match value {
      | Some(value) => format!("return {}", render(value)),
      | None => "return".to_string(),
    },
    | Statement::If(_, statement) => {
      let mut text = format!("if {} {}", render(&statement.test), block(&statement.consequent));

      for clause in &statement.elifs {
        text.push_str(&format!(" elif {} {}", render(&clause.test), block(&clause.consequent)));
      }

      if let Some(alternate) = &statement.alternate {
        text.push_str(&format!(" else {}", block(alternate)));
      }

      text
    },
    | Statement::While(_, test, body) => format!("while {} {}", render(test), block(body)),
    | Statement::For(_, statement) => format!(
      "for ({}; {}; {}) {}",
      optional_statement(&statement.init),
      statement.test.as_ref().map(render).unwrap_or_default(),
      optional_statement(&statement.update),
      block(&statement.body)
    ),
    | Statement::ForEach(_, name, iterable, body) => {
      format!("forEach {name} in {} {}", render(iterable), block(body))
    },
    | Statement::Break(_) => "break".to_string(),
    | Statement::Continue(_) => "continue".to_string(),
    | Statement::Try(_, statement) => {
      let mut text = format!("try {}", block(&statement.block));

      if let Some(handler) = &statement.handler {
        text.push_str(&format!(" catch ({}) {}", handler.param, block(&handler.body)));
      }

      if let Some(finalizer) = &statement.finalizer {
        text.push_str(&format!(" finally {}", block(finalizer)));
      }

      text
    },
    | Statement::Throw(_, value) => format!("throw {}", render(value)),
    | Statement::Block(body) => block(body),
    | Statement::Disable(_, name) => format!("disable '{name}'"),
    | Statement::Able(_, names) => {
      let names = names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");

      format!("able {names}")
    },
  }
}

use std::rc::Rc;

use super::combinators;
use super::lookahead::{self, TemplateContext};
use super::statement;
use super::template;
use crate::ast::*;
use crate::errors::*;
use crate::lexer::Token;
use crate::source::{Input, Range};

pub fn parse_expression(input: Input) -> Result<(Expression, Input), ParseError> {
  parse_binary(input, 0)
}

/// Binding power of binary operators; all of them are left-associative.
fn binary_operator(token: &Token) -> Option<(Operator, u8)> {
  let operator = match token {
    | Token::OrOr => (Operator::Logical(LogicalOp::Or), 0),
    | Token::AndAnd => (Operator::Logical(LogicalOp::And), 1),
    | Token::EqualEqual => (Operator::Binary(BinaryOp::Equal), 2),
    | Token::StrictEqual => (Operator::Binary(BinaryOp::StrictEqual), 2),
    | Token::NotEqual => (Operator::Binary(BinaryOp::NotEqual), 2),
    | Token::StrictNotEqual => (Operator::Binary(BinaryOp::StrictNotEqual), 2),
    | Token::Less => (Operator::Binary(BinaryOp::Less), 3),
    | Token::LessEqual => (Operator::Binary(BinaryOp::LessEqual), 3),
    | Token::Greater => (Operator::Binary(BinaryOp::Greater), 3),
    | Token::GreaterEqual => (Operator::Binary(BinaryOp::GreaterEqual), 3),
    | Token::Plus => (Operator::Binary(BinaryOp::Add), 4),
    | Token::Minus => (Operator::Binary(BinaryOp::Subtract), 4),
    | Token::Star => (Operator::Binary(BinaryOp::Multiply), 5),
    | Token::Slash => (Operator::Binary(BinaryOp::Divide), 5),
    | Token::Percent => (Operator::Binary(BinaryOp::Modulo), 5),
    | Token::Caret => (Operator::Binary(BinaryOp::Power), 5),
    | _ => return None,
  };

  Some(operator)
}

#[derive(Clone, Copy)]
enum Operator {
  Binary(BinaryOp),
  Logical(LogicalOp),
}

fn parse_binary(input: Input, min_power: u8) -> Result<(Expression, Input), ParseError> {
  let (mut left, mut input) = parse_unary(input)?;

  while let Some((operator, power)) = binary_operator(&input.read()) {
    if power < min_power {
      break;
    }

    let (right, rest) = parse_binary(input.next(), power + 1)?;
    let range = left.get_range().to(right.get_range());

    left = match operator {
      | Operator::Binary(op) => Expression::Binary(range, op, Box::new(left), Box::new(right)),
      | Operator::Logical(op) => Expression::Logical(range, op, Box::new(left), Box::new(right)),
    };

    input = rest;
  }

  Ok((left, input))
}

fn parse_unary(input: Input) -> Result<(Expression, Input), ParseError> {
  let op = match input.read() {
    | Token::Bang => UnaryOp::Not,
    | Token::Minus => UnaryOp::Negate,
    | _ => return parse_postfix(input),
  };

  let start = input.pos();
  let (operand, input) = parse_unary(input.next())?;

  Ok((
    Expression::Unary(input.range_from(start), op, Box::new(operand)),
    input,
  ))
}

fn parse_postfix(input: Input) -> Result<(Expression, Input), ParseError> {
  let (mut expression, mut input) = parse_primary(input)?;
  let start = expression.get_range().start;

  loop {
    match input.read() {
      | Token::Dot => {
        let (name, rest) = member_name(input.next())?;

        expression = Expression::Member(rest.range_from(start), Box::new(expression), name);
        input = rest;
      },
      | Token::LeftBracket => {
        let (index, rest) = parse_expression(input.next().enter_group())?;
        let rest = combinators::expect(Token::RightBracket, rest)?.exit_group();

        expression = Expression::Index(
          rest.range_from(start),
          Box::new(expression),
          Box::new(index),
        );

        input = rest;
      },
      | Token::LeftParen => {
        let (arguments, rest) = parse_arguments(input)?;

        expression = Expression::Call(rest.range_from(start), Box::new(expression), arguments);
        input = rest;
      },
      | Token::QueryIsBoolean | Token::NegatedIsBoolean | Token::IsBooleanKw => {
        let (boolean_op, rest) = parse_boolean_op(expression, input);

        expression = boolean_op;
        input = rest;
      },
      | _ => break,
    }
  }

  Ok((expression, input))
}

/// Property names after `.` may be keywords, e.g. `console.text.var`.
fn member_name(input: Input) -> Result<(String, Input), ParseError> {
  match input.read() {
    | Token::Ident(name) => Ok((name, input.next())),
    | keyword if keyword.is_keyword() => Ok((keyword.to_string(), input.next())),
    | found => Err(ParseError::expected(input.range(), "property name", found)),
  }
}

/// `?isBoolean`, `!isBoolean` or `isBoolean`, with an optional `.t`/`.f` suffix, applied to
/// `subject`. The input must sit on the operator.
pub fn parse_boolean_op(subject: Expression, input: Input) -> (Expression, Input) {
  let start = subject.get_range().start;

  let (kind, negate) = match input.read() {
    | Token::NegatedIsBoolean => (BooleanOpKind::Query, true),
    | Token::IsBooleanKw => (BooleanOpKind::Cast, false),
    | _ => (BooleanOpKind::Query, false),
  };

  let input = input.next();
  let after_dot = input.next();

  let (force, input) = match (input.read(), after_dot.read()) {
    | (Token::Dot, Token::Ident(suffix)) if suffix == "t" => (Some(true), after_dot.next()),
    | (Token::Dot, Token::Ident(suffix)) if suffix == "f" => (Some(false), after_dot.next()),
    | _ => (None, input),
  };

  let op = BooleanOp {
    subject: Box::new(subject),
    kind,
    negate,
    force,
  };

  (Expression::BooleanOp(input.range_from(start), op), input)
}

/// Call arguments; the input must sit on `(`.
pub fn parse_arguments(input: Input) -> Result<(Vec<Argument>, Input), ParseError> {
  let open = input.range();
  let inner = input.next().enter_group();

  if lookahead::is_bare_template(inner.skip_newlines().rest(), TemplateContext::Arguments) {
    let (template, rest) = template::parse_bare_template(inner, open.end, TemplateContext::Arguments);
    let rest = combinators::expect_closing(Token::RightParen, rest).exit_group();

    return Ok((vec![Argument::Positional(template)], rest));
  }

  let (arguments, rest) = combinators::comma0(&parse_argument, &Token::RightParen, inner)?;
  let rest = combinators::expect(Token::RightParen, rest)?.exit_group();

  Ok((arguments, rest))
}

fn parse_argument(input: Input) -> Result<(Argument, Input), ParseError> {
  match (input.read(), input.next().read()) {
    | (Token::Ident(name), Token::Colon) => {
      let start = input.pos();
      let (value, input) = parse_expression(input.next().next())?;

      Ok((Argument::Named(input.range_from(start), name, value), input))
    },
    | _ => {
      let (value, input) = parse_expression(input)?;
      Ok((Argument::Positional(value), input))
    },
  }
}

fn parse_primary(input: Input) -> Result<(Expression, Input), ParseError> {
  let range = input.range();

  let (expression, input) = match input.read() {
    | Token::LitNumber(value) => (Expression::Number(range, value), input.next()),
    | Token::LitDuration(duration) => (Expression::Duration(range, duration), input.next()),
    | Token::LitString(literal) => {
      let (expression, errors) = template::string_literal(input.source(), literal, range);
      let input = errors
        .into_iter()
        .fold(input.next(), |input, error| input.with_error(error));

      (expression, input)
    },
    | Token::TrueKw => (Expression::Boolean(range, true), input.next()),
    | Token::FalseKw => (Expression::Boolean(range, false), input.next()),
    | Token::NullKw => (Expression::Null(range), input.next()),
    | Token::Ident(name) => {
      let next = input.next();

      match (next.read(), next.next().read(), Store::from_prefix(&name)) {
        | (Token::FatArrow, _, _) => parse_arrow(input, false)?,
        | (Token::Dot, Token::Ident(member), Some(store)) => {
          let input = next.next().next();
          (Expression::Namespaced(input.range_from(range.start), store, member), input)
        },
        | _ => (Expression::Identifier(range, name), next),
      }
    },
    | Token::LeftParen if lookahead::is_arrow(input.rest()) => parse_arrow(input, false)?,
    | Token::LeftParen => {
      let (expression, rest) = parse_expression(input.next().enter_group())?;
      let rest = combinators::expect(Token::RightParen, rest)?.exit_group();

      (expression, rest)
    },
    | Token::LeftBracket => {
      let inner = input.next().enter_group();
      let (items, rest) = combinators::comma0(&parse_expression, &Token::RightBracket, inner)?;
      let rest = combinators::expect(Token::RightBracket, rest)?.exit_group();

      (Expression::Array(rest.range_from(range.start), items), rest)
    },
    | Token::LeftBrace => parse_object(input)?,
    | Token::FuncKw => parse_function_expression(input, false)?,
    | Token::AsyncKw => {
      let next = input.next();

      match next.read() {
        | Token::FuncKw => {
          let (expression, rest) = parse_function_expression(next, true)?;
          (with_start(expression, range), rest)
        },
        | _ => {
          let (expression, rest) = parse_arrow(next, true)?;
          (with_start(expression, range), rest)
        },
      }
    },
    | found => return Err(ParseError::UnexpectedToken { range, found }),
  };

  Ok((expression, input))
}

/// Widens a function expression's range to include a leading `async`.
fn with_start(expression: Expression, start: Range) -> Expression {
  match expression {
    | Expression::Arrow(range, function) => Expression::Arrow(start.to(range), function),
    | other => other,
  }
}

fn parse_object(input: Input) -> Result<(Expression, Input), ParseError> {
  let start = input.pos();
  let inner = input.next().enter_group();

  let (properties, rest) = combinators::comma0(&parse_property, &Token::RightBrace, inner)?;
  let rest = combinators::expect(Token::RightBrace, rest)?.exit_group();

  Ok((Expression::Object(rest.range_from(start), properties), rest))
}

fn parse_property(input: Input) -> Result<(Property, Input), ParseError> {
  let start = input.pos();

  let key = match input.read() {
    | Token::Ident(name) => name,
    | Token::LitString(literal) => literal.value,
    | Token::LitNumber(value) => value.to_string(),
    | keyword if keyword.is_keyword() => keyword.to_string(),
    | found => {
      return Err(ParseError::expected(
        input.range(),
        "property name",
        found,
      ))
    },
  };

  let input = combinators::expect(Token::Colon, input.next())?;
  let (value, input) = parse_expression(input)?;

  Ok((
    Property {
      range: input.range_from(start),
      key,
      value,
    },
    input,
  ))
}

/// Parameter list; the input must sit on `(`.
pub fn parse_params(input: Input) -> Result<(Vec<Param>, Input), ParseError> {
  let input = combinators::expect(Token::LeftParen, input)?.enter_group();
  let (params, input) = combinators::comma0(&parse_param, &Token::RightParen, input)?;
  let input = combinators::expect(Token::RightParen, input)?.exit_group();

  Ok((params, input))
}

fn parse_param(input: Input) -> Result<(Param, Input), ParseError> {
  let start = input.pos();
  let (name, input) = combinators::expect_ident(input)?;

  let (default, input) = match input.read() {
    | Token::Assign => {
      let (value, input) = parse_expression(input.next())?;
      (Some(value), input)
    },
    | _ => (None, input),
  };

  Ok((
    Param {
      range: input.range_from(start),
      name,
      default,
    },
    input,
  ))
}

/// `x => ...` or `(a, b) => ...`.
fn parse_arrow(input: Input, is_async: bool) -> Result<(Expression, Input), ParseError> {
  let start = input.pos();

  let (params, input) = match input.read() {
    | Token::Ident(name) => {
      let param = Param {
        range: input.range(),
        name,
        default: None,
      };

      (vec![param], input.next())
    },
    | _ => parse_params(input)?,
  };

  let input = combinators::expect(Token::FatArrow, input.skip_newlines())?;

  let (body, input) = match input.skip_newlines().read() {
    | Token::LeftBrace => {
      let (block, input) = statement::parse_block(input.skip_newlines(), "arrow function")?;
      (FunctionBody::Block(block), input)
    },
    | _ => {
      let (expression, input) = parse_expression(input)?;
      (FunctionBody::Expression(Box::new(expression)), input)
    },
  };

  let range = input.range_from(start);

  let function = FunctionDef {
    range,
    name: None,
    is_async,
    params,
    body,
  };

  Ok((Expression::Arrow(range, Rc::new(function)), input))
}

/// `func [name](params) { ... }` used as a value.
fn parse_function_expression(input: Input, is_async: bool) -> Result<(Expression, Input), ParseError> {
  let start = input.pos();
  let input = combinators::expect(Token::FuncKw, input)?;
  let (name, input) = combinators::optional(&combinators::expect_ident, input);
  let (params, input) = parse_params(input)?;
  let (body, input) = statement::parse_block(input, "function")?;

  let range = input.range_from(start);

  let function = FunctionDef {
    range,
    name,
    is_async,
    params,
    body: FunctionBody::Block(body),
  };

  Ok((Expression::Arrow(range, Rc::new(function)), input))
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::parser::testing::*;

  #[test]
  fn test_precedence() {
    assert_eq!(
      shape(parse_expression, "1 + 2 * 3 - 4"),
      "((1 + (2 * 3)) - 4)"
    );
    assert_eq!(
      shape(parse_expression, "a || b && c == d < e"),
      "(a || (b && (c == (d < e))))"
    );
    assert_eq!(shape(parse_expression, "2 ^ 3 * 4"), "((2 ^ 3) * 4)");
    assert_eq!(shape(parse_expression, "-a + !b"), "((-a) + (!b))");
    assert_eq!(shape(parse_expression, "(1 + 2) * 3"), "((1 + 2) * 3)");
  }

  #[test]
  fn test_postfix_chains() {
    assert_eq!(
      shape(parse_expression, "console.text.var(\"big\")"),
      "console.text.var(\"big\")"
    );
    assert_eq!(shape(parse_expression, "a[0].b(c)[d]"), "a[0].b(c)[d]");
    assert_eq!(shape(parse_expression, "l.count + c.max"), "(l.count + c.max)");
  }

  #[test]
  fn test_named_arguments() {
    assert_eq!(
      shape(parse_expression, "greet(\"x\", loud: true)"),
      "greet(\"x\", loud: true)"
    );
  }

  #[test]
  fn test_boolean_ops() {
    assert_eq!(shape(parse_expression, "x ?isBoolean"), "(x ?isBoolean)");
    assert_eq!(shape(parse_expression, "x !isBoolean.t"), "(x !isBoolean.t)");
    assert_eq!(shape(parse_expression, "x isBoolean.f"), "(x isBoolean.f)");
    assert_eq!(
      shape(parse_expression, "a ?isBoolean && b"),
      "((a ?isBoolean) && b)"
    );
  }

  #[test]
  fn test_arrows() {
    assert_eq!(shape(parse_expression, "x => x * 2"), "(x) => (x * 2)");
    assert_eq!(shape(parse_expression, "(a, b) => a + b"), "(a, b) => (a + b)");
    assert_eq!(shape(parse_expression, "() => { }"), "() => {0}");
    assert_eq!(shape(parse_expression, "async (a) => a"), "async (a) => a");
    assert_eq!(shape(parse_expression, "(a)"), "a");
  }

  #[test]
  fn test_literals() {
    assert_eq!(
      shape(parse_expression, "[1, 'two', {a: 1, 'b c': [2]}, null, 5s]"),
      "[1, \"two\", {a: 1, b c: [2]}, null, 5000ms]"
    );
    assert_eq!(shape(parse_expression, "[\n  1,\n  2,\n]"), "[1, 2]");
  }

  #[test]
  fn test_string_template() {
    assert_eq!(
      shape(parse_expression, "'hi {name}, {1 + 2}!'"),
      "`hi ${name}, ${(1 + 2)}!`"
    );
    assert_eq!(shape(parse_expression, "'empty {}'"), "\"empty {}\"");
  }

  #[test]
  fn test_bare_templates() {
    assert_eq!(
      shape(parse_expression, "inp(What's your name? >> )"),
      "inp(\"What's your name? >> \")"
    );
    assert_eq!(
      shape(parse_expression, "print(Hello {name}!)"),
      "print(`Hello ${name}!`)"
    );
  }

  #[test]
  fn test_errors() {
    assert!(parse_expression(input_of("(1 + ")).is_err());
    assert!(parse_expression(input_of("[1, 2")).is_err());
    assert!(parse_expression(input_of("a.")).is_err());
  }
}

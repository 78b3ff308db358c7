use std::rc::Rc;

use super::combinators::{self, skip_newlines_before, skip_terminators, synchronize};
use super::expression::{self, parse_expression};
use super::lookahead::{self, TemplateContext};
use super::template;
use crate::ast::*;
use crate::errors::*;
use crate::lexer::{Lexer, Token};
use crate::source::{Input, Range};

/// Parses statements until the end of input, recovering from errors.
pub fn parse_program(input: Input) -> (Program, Input) {
  let source = input.source().clone();
  let (body, input) = parse_statements(input, true);

  let program = Program {
    range: Range::new(source.position_at(0), source.end_position()),
    body,
  };

  (program, input)
}

fn parse_statements(input: Input, top_level: bool) -> (Vec<Statement>, Input) {
  let mut body = vec![];
  let mut input = input;

  loop {
    input = skip_terminators(input);

    match input.read() {
      | Token::Eof => break,
      | Token::RightBrace if !top_level => break,
      | Token::RightBrace => {
        let error = ParseError::UnexpectedToken {
          range: input.range(),
          found: Token::RightBrace,
        };

        input = input.with_error(error).next();
        continue;
      },
      | _ => {},
    }

    match parse_statement(input.clone()) {
      | Ok((statement, rest)) => {
        body.push(statement);
        input = expect_terminator(rest);
      },
      | Err(error) => {
        input = recover(input, error);
      },
    }
  }

  (body, input)
}

/// Skips the rest of a failed statement. When the failure lies in text the current token stream
/// no longer describes (a bare template made the parser lex the tail again), lexing restarts at the
/// failure so a misread quote cannot swallow the following lines.
fn recover(input: Input, error: ParseError) -> Input {
  let failed_at = error.range().start;

  if input.has_token_at(failed_at.offset) {
    return synchronize(input.with_error(error));
  }

  let tail = Lexer::starting_at(input.source(), failed_at).read_all();
  let lex_errors = tail.errors.into_iter().map(ParseError::from).collect();
  let statement_start = input.pos().offset;

  synchronize(
    input
      .resume_with(tail.tokens, lex_errors, statement_start)
      .with_error(error),
  )
}

/// Statements end with a newline or `;`, unless they end with a block or close the enclosing one.
fn expect_terminator(input: Input) -> Input {
  let closed_block = matches!(
    input.previous().map(|token| &token.token),
    Some(Token::RightBrace)
  );

  match input.read_forced() {
    | Token::Newline | Token::Semicolon | Token::Eof | Token::RightBrace => input,
    | _ if closed_block => input,
    | Token::Assign => {
      let error = ParseError::InvalidAssignment {
        range: input.range(),
      };

      synchronize(input.with_error(error))
    },
    | found => {
      let error = ParseError::expected(input.range(), "newline or ';'", found);
      synchronize(input.with_error(error))
    },
  }
}

/// `{ statements }`. A missing `{` is recorded and replaced by an empty block.
pub fn parse_block(input: Input, context: &'static str) -> Result<(Block, Input), ParseError> {
  let start = input.pos();

  if input.read() != Token::LeftBrace {
    let error = ParseError::MissingBlock {
      range: input.range(),
      context,
    };

    return Ok((Block::empty(Range::at(input.pos_end())), input.with_error(error)));
  }

  let nesting = input.nesting();
  let (body, input) = parse_statements(input.next().with_nesting(0), false);
  let input = combinators::expect_closing(Token::RightBrace, input).with_nesting(nesting);

  Ok((
    Block {
      range: input.range_from(start),
      body,
    },
    input,
  ))
}

pub fn parse_statement(input: Input) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();

  let (statement, input) = match input.read() {
    | Token::LetKw | Token::VarKw | Token::ConstKw => parse_declaration(input)?,
    | Token::FuncKw => parse_function_declaration(input, false)?,
    | Token::AsyncKw if input.next().read() == Token::FuncKw => {
      let (statement, input) = parse_function_declaration(input.next(), true)?;

      match statement {
        | Statement::FunctionDeclaration(_, function) => {
          (Statement::FunctionDeclaration(input.range_from(start), function), input)
        },
        | other => (other, input),
      }
    },
    | Token::ReturnKw => {
      let input = input.next();

      match input.read_forced() {
        | Token::Newline | Token::Semicolon | Token::Eof | Token::RightBrace => {
          (Statement::Return(input.range_from(start), None), input)
        },
        | _ => {
          let (value, input) = parse_expression(input)?;
          (Statement::Return(input.range_from(start), Some(value)), input)
        },
      }
    },
    | Token::IfKw => parse_if(input)?,
    | Token::WhileKw => {
      let (test, input) = parse_expression(input.next())?;
      let (body, input) = parse_block(input, "while")?;

      (Statement::While(input.range_from(start), test, body), input)
    },
    | Token::ForKw => parse_for(input)?,
    | Token::ForEachKw => parse_for_each(input)?,
    | Token::BreakKw => (Statement::Break(input.range()), input.next()),
    | Token::ContinueKw => (Statement::Continue(input.range()), input.next()),
    | Token::TryKw => parse_try(input)?,
    | Token::ThrowKw => {
      let input = input.next();

      let (value, input) = if lookahead::is_bare_template(input.rest(), TemplateContext::Line) {
        let position = input.pos();
        template::parse_bare_template(input, position, TemplateContext::Line)
      } else {
        parse_expression(input)?
      };

      (Statement::Throw(input.range_from(start), value), input)
    },
    | Token::LeftBrace => {
      let (block, input) = parse_block(input, "block")?;
      (Statement::Block(block), input)
    },
    | Token::DisableKw => parse_disable(input)?,
    | Token::AbleKw => parse_able(input)?,
    | _ if lookahead::is_assignment(input.rest()) => parse_assignment(input)?,
    | _ => parse_expression_statement(input)?,
  };

  Ok((statement, input))
}

/// Statements allowed in the header of a `for` loop.
fn parse_simple_statement(input: Input) -> Result<(Statement, Input), ParseError> {
  match input.read() {
    | Token::LetKw | Token::VarKw | Token::ConstKw => parse_declaration(input),
    | _ if lookahead::is_assignment(input.rest()) => parse_assignment(input),
    | _ => parse_expression_statement(input),
  }
}

fn parse_declaration(input: Input) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();

  let kind = match input.read() {
    | Token::VarKw => DeclKind::Var,
    | Token::ConstKw => DeclKind::Const,
    | _ => DeclKind::Let,
  };

  let (name, input) = combinators::expect_ident(input.next())?;

  let (value, input) = match input.read() {
    | Token::Assign => {
      let (value, input) = parse_expression(input.next())?;
      (Some(value), input)
    },
    | _ => (None, input),
  };

  Ok((
    Statement::VariableDeclaration(input.range_from(start), kind, name, value),
    input,
  ))
}

fn parse_function_declaration(input: Input, is_async: bool) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();
  let input = combinators::expect(Token::FuncKw, input)?;
  let (name, input) = combinators::expect_ident(input)?;
  let (params, input) = expression::parse_params(input)?;
  let (body, input) = parse_block(input, "function")?;

  let range = input.range_from(start);

  let function = FunctionDef {
    range,
    name: Some(name),
    is_async,
    params,
    body: FunctionBody::Block(body),
  };

  Ok((Statement::FunctionDeclaration(range, Rc::new(function)), input))
}

fn parse_assignment(input: Input) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();
  let (target, input) = parse_expression(input)?;

  if !target.is_assignable() {
    return Err(ParseError::InvalidAssignment {
      range: target.get_range(),
    });
  }

  let input = combinators::expect(Token::Assign, input)?;

  // `x = ?isBoolean` tests the target itself.
  let (value, input) = match input.read() {
    | Token::QueryIsBoolean | Token::NegatedIsBoolean | Token::IsBooleanKw => {
      expression::parse_boolean_op(target.clone(), input)
    },
    | _ => parse_expression(input)?,
  };

  Ok((
    Statement::Assignment(input.range_from(start), target, value),
    input,
  ))
}

fn parse_expression_statement(input: Input) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();
  let (expression, input) = parse_expression(input)?;

  Ok((Statement::Expression(input.range_from(start), expression), input))
}

fn parse_if(input: Input) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();
  let (test, input) = parse_expression(input.next())?;
  let (consequent, mut input) = parse_block(input, "if")?;

  let mut elifs = vec![];
  let mut alternate = None;

  loop {
    let ahead = skip_newlines_before(&[Token::ElifKw, Token::ElseKw], input.clone());
    let clause_start = ahead.pos();

    let clause = match ahead.read() {
      | Token::ElifKw => ahead.next(),
      | Token::ElseKw if ahead.next().read() == Token::IfKw => ahead.next().next(),
      | Token::ElseKw => {
        let (block, rest) = parse_block(ahead.next(), "else")?;

        alternate = Some(block);
        input = rest;
        break;
      },
      | _ => break,
    };

    let (test, rest) = parse_expression(clause)?;
    let (consequent, rest) = parse_block(rest, "elif")?;

    elifs.push(ElifClause {
      range: rest.range_from(clause_start),
      test,
      consequent,
    });

    input = rest;
  }

  let statement = IfStatement {
    test,
    consequent,
    elifs,
    alternate,
  };

  Ok((Statement::If(input.range_from(start), statement), input))
}

fn parse_for(input: Input) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();
  let input = input.next();
  let parenthesized = input.read() == Token::LeftParen;

  let input = if parenthesized {
    input.next().enter_group()
  } else {
    input
  };

  let (init, input) = match input.read() {
    | Token::Semicolon => (None, input),
    | _ => {
      let (init, input) = parse_simple_statement(input)?;
      (Some(Box::new(init)), input)
    },
  };

  let input = combinators::expect(Token::Semicolon, input)?;

  let (test, input) = match input.read() {
    | Token::Semicolon => (None, input),
    | _ => {
      let (test, input) = parse_expression(input)?;
      (Some(test), input)
    },
  };

  let input = combinators::expect(Token::Semicolon, input)?;

  let (update, input) = match input.read() {
    | Token::RightParen | Token::LeftBrace => (None, input),
    | _ => {
      let (update, input) = parse_simple_statement(input)?;
      (Some(Box::new(update)), input)
    },
  };

  let input = if parenthesized {
    combinators::expect(Token::RightParen, input)?.exit_group()
  } else {
    input
  };

  let (body, input) = parse_block(input, "for")?;

  let statement = ForStatement {
    init,
    test,
    update,
    body,
  };

  Ok((Statement::For(input.range_from(start), statement), input))
}

fn parse_for_each(input: Input) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();
  let input = input.next();
  let parenthesized = input.read() == Token::LeftParen;

  let input = if parenthesized {
    input.next().enter_group()
  } else {
    input
  };

  let (name, input) = combinators::expect_ident(input)?;
  let input = combinators::expect(Token::InKw, input)?;
  let (iterable, input) = parse_expression(input)?;

  let input = if parenthesized {
    combinators::expect(Token::RightParen, input)?.exit_group()
  } else {
    input
  };

  let (body, input) = parse_block(input, "forEach")?;

  Ok((
    Statement::ForEach(input.range_from(start), name, iterable, body),
    input,
  ))
}

fn parse_try(input: Input) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();
  let (block, input) = parse_block(input.next(), "try")?;

  let ahead = skip_newlines_before(&[Token::CatchKw], input.clone());

  let (handler, input) = match ahead.read() {
    | Token::CatchKw => {
      let clause_start = ahead.pos();
      let after = ahead.next();

      let (param, after) = match after.read() {
        | Token::LeftParen => {
          let (name, rest) = combinators::expect_ident(after.next())?;
          (name, combinators::expect(Token::RightParen, rest)?)
        },
        | Token::Ident(name) => (name, after.next()),
        | _ => ("error".to_string(), after),
      };

      let (body, rest) = parse_block(after, "catch")?;

      let handler = CatchClause {
        range: rest.range_from(clause_start),
        param,
        body,
      };

      (Some(handler), rest)
    },
    | _ => (None, input),
  };

  let ahead = skip_newlines_before(&[Token::FinallyKw], input.clone());

  let (finalizer, input) = match ahead.read() {
    | Token::FinallyKw => {
      let (body, rest) = parse_block(ahead.next(), "finally")?;
      (Some(body), rest)
    },
    | _ => (None, input),
  };

  let input = if handler.is_none() && finalizer.is_none() {
    let error = ParseError::expected(input.range(), "'catch' or 'finally'", input.read());
    input.with_error(error)
  } else {
    input
  };

  let statement = TryStatement {
    block,
    handler,
    finalizer,
  };

  Ok((Statement::Try(input.range_from(start), statement), input))
}

fn expect_module_name(input: Input) -> Result<(String, Input), ParseError> {
  match input.read() {
    | Token::LitString(literal) if !literal.has_holes() => Ok((literal.value, input.next())),
    | found => Err(ParseError::expected(
      input.range(),
      "quoted module name",
      found,
    )),
  }
}

/// `disable 'AllInOne'`; any other target is rejected.
fn parse_disable(input: Input) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();
  let name_range = input.next().range();
  let (name, input) = expect_module_name(input.next())?;

  if name != "AllInOne" {
    return Err(ParseError::InvalidDirective {
      range: name_range,
      message: format!("only 'AllInOne' can be disabled, found '{name}'"),
    });
  }

  Ok((Statement::Disable(input.range_from(start), name), input))
}

fn parse_able(input: Input) -> Result<(Statement, Input), ParseError> {
  let start = input.pos();
  let (names, input) = combinators::comma1(&expect_module_name, input.next())?;

  Ok((Statement::Able(input.range_from(start), names), input))
}

#[cfg(test)]
mod tests {
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::parser::testing::*;

  #[test]
  fn test_declarations() {
    assert_eq!(
      statements("let x = 5\nvar y\nconst z = 'a'; c.w = 1"),
      vec!["let x = 5", "var y", "const z = \"a\"", "c.w = 1"]
    );
  }

  #[test]
  fn test_if_chain() {
    let code = indoc! {"
      if (x > 3) {
        print(1)
      } elif x > 1 {
        print(2)
      }
      else if x {
      } else {
        print(3)
      }
    "};

    assert_eq!(
      statements(code),
      vec!["if (x > 3) {1} elif (x > 1) {1} elif x {0} else {1}"]
    );
  }

  #[test]
  fn test_loops() {
    let code = indoc! {"
      while (n < 3) { n = n + 1 }
      for (let i = 0; i < 3; i = i + 1) { print(i) }
      forEach (item in items) { print(item); break }
      forEach x in [1, 2] { continue }
    "};

    assert_eq!(
      statements(code),
      vec![
        "while (n < 3) {1}",
        "for (let i = 0; (i < 3); i = (i + 1)) {1}",
        "forEach item in items {2}",
        "forEach x in [1, 2] {1}",
      ]
    );
  }

  #[test]
  fn test_functions() {
    let code = indoc! {"
      func add(a, b = 1) { return a + b }
      async func load() { return }
      let twice = x => x * 2
    "};

    assert_eq!(
      statements(code),
      vec![
        "func add(a, b = 1) {1}",
        "async func load() {1}",
        "let twice = (x) => (x * 2)",
      ]
    );
  }

  #[test]
  fn test_try() {
    let code = indoc! {"
      try { risky() } catch (e) { print(e) } finally { done() }
      try {
        risky()
      }
      catch {
        print(error)
      }
    "};

    assert_eq!(
      statements(code),
      vec![
        "try {1} catch (e) {1} finally {1}",
        "try {1} catch (error) {1}",
      ]
    );
  }

  #[test]
  fn test_throw_template() {
    assert_eq!(
      statements("throw Could not load {name}\nprint(1)"),
      vec!["throw `Could not load ${name}`", "print(1)"]
    );
    assert_eq!(statements("throw 'plain'"), vec!["throw \"plain\""]);
  }

  #[test]
  fn test_directives() {
    assert_eq!(
      statements("disable 'AllInOne';\nable 'Math', \"Time\""),
      vec!["disable 'AllInOne'", "able 'Math', 'Time'"]
    );

    let output = parse("disable 'Math'\nprint(1)");

    assert_eq!(codes(&output), vec!["PARSE_INVALID_DIRECTIVE"]);
    assert_eq!(output.program.body.len(), 1);
  }

  #[test]
  fn test_boolean_assignment() {
    assert_eq!(
      statements("flag = ?isBoolean.t\nok = value isBoolean"),
      vec!["flag = (flag ?isBoolean.t)", "ok = (value isBoolean)"]
    );
  }

  #[test]
  fn test_assignment_rewind() {
    for code in ["a.b", "a.b[c]", "l.x + 1", "a.b == c", "x"] {
      let statement = parse(code).program.body.remove(0);
      let expression = parse_expression(input_of(code)).map(|(e, _)| e).ok();

      match statement {
        | Statement::Expression(_, parsed) => assert_eq!(Some(parsed), expression),
        | other => panic!("expected expression statement for '{code}', found {other:?}"),
      }
    }
  }

  #[test]
  fn test_recovery() {
    let code = indoc! {"
      let = 5
      print(1)
      if x print(2)
      a.b() = 3
      }
      print(4)
    "};

    let output = parse(code);

    assert_eq!(
      codes(&output),
      vec![
        "PARSE_EXPECTED",
        "PARSE_MISSING_BLOCK",
        "PARSE_EXPECTED",
        "PARSE_INVALID_ASSIGNMENT",
        "PARSE_UNEXPECTED_TOKEN",
      ]
    );

    assert_eq!(
      render_program(&output.program),
      vec!["print(1)", "if x {0}", "a.b()", "print(4)"]
    );
  }

  #[test]
  fn test_recovery_after_bare_template() {
    let output = parse("let a = inp(What's up) +\nprint(1)\nprint(2)");

    assert_eq!(codes(&output), vec!["PARSE_UNEXPECTED_TOKEN"]);
    assert_eq!(render_program(&output.program), vec!["print(1)", "print(2)"]);
  }

  #[test]
  fn test_missing_closing_brace() {
    let output = parse("if x {\n  print(1)\n");

    assert_eq!(codes(&output), vec!["PARSE_EXPECTED"]);
    assert_eq!(render_program(&output.program), vec!["if x {1}"]);
  }

  #[test]
  fn test_bare_template_discards_lexer_errors() {
    let output = parse("let name = inp(What's your name? >> )\nprint('hi {name}')");

    assert!(output.errors.is_empty(), "{:?}", output.errors);
    assert_eq!(
      render_program(&output.program),
      vec![
        "let name = inp(\"What's your name? >> \")",
        "print(`hi ${name}`)"
      ]
    );
  }

  #[test]
  fn test_lexer_errors_outside_templates_survive() {
    let output = parse("print(a) @");

    assert_eq!(codes(&output), vec!["LEX_UNEXPECTED_CHARACTER", "PARSE_EXPECTED"]);
  }
}

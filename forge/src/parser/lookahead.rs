//! Bounded, side-effect free scans over the raw token stream. None of these consume input; the
//! caller decides what to parse based on the answer.

use crate::lexer::{SpannedToken, Token};

fn kind(tokens: &[SpannedToken], index: usize) -> &Token {
  tokens
    .get(index)
    .map(|token| &token.token)
    .unwrap_or(&Token::Eof)
}

/// Index of the token closing the group opened at `open`, if any.
fn matching_close(tokens: &[SpannedToken], open: usize) -> Option<usize> {
  let mut depth = 0u32;

  for (index, token) in tokens.iter().enumerate().skip(open) {
    match token.token {
      | Token::LeftParen | Token::LeftBracket | Token::LeftBrace => depth += 1,
      | Token::RightParen | Token::RightBracket | Token::RightBrace => {
        depth = depth.saturating_sub(1);

        if depth == 0 {
          return Some(index);
        }
      },
      | Token::Eof => return None,
      | _ => {},
    }
  }

  None
}

/// Whether the statement is `assignable = ...`, where assignable is an identifier followed by
/// `.name` and `[index]` accessors only.
pub fn is_assignment(tokens: &[SpannedToken]) -> bool {
  if !matches!(kind(tokens, 0), Token::Ident(_)) {
    return false;
  }

  let mut index = 1;

  loop {
    match kind(tokens, index) {
      | Token::Dot => {
        if !matches!(kind(tokens, index + 1), Token::Ident(_)) {
          return false;
        }

        index += 2;
      },
      | Token::LeftBracket => match matching_close(tokens, index) {
        | Some(close) => index = close + 1,
        | None => return false,
      },
      | Token::Assign => return true,
      | _ => return false,
    }
  }
}

/// Whether the `(` at the start of `tokens` opens arrow function parameters.
pub fn is_arrow(tokens: &[SpannedToken]) -> bool {
  let close = match matching_close(tokens, 0) {
    | Some(close) => close,
    | None => return false,
  };

  tokens[close + 1..]
    .iter()
    .find(|token| token.token != Token::Newline)
    .map(|token| token.token == Token::FatArrow)
    .unwrap_or(false)
}

fn is_expression_start(token: &Token) -> bool {
  matches!(
    token,
    Token::Ident(_)
      | Token::LitNumber(_)
      | Token::LitString(_)
      | Token::LitDuration(_)
      | Token::TrueKw
      | Token::FalseKw
      | Token::NullKw
      | Token::FuncKw
      | Token::AsyncKw
      | Token::LeftParen
      | Token::LeftBracket
      | Token::LeftBrace
      | Token::Bang
      | Token::Minus
  )
}

/// Tokens that read like a word of prose when two of them sit next to each other.
fn is_word(token: &Token) -> bool {
  match token {
    | Token::Ident(_) | Token::LitNumber(_) | Token::LitDuration(_) => true,
    | Token::AsyncKw | Token::FuncKw | Token::IsBooleanKw | Token::InKw => false,
    | keyword => keyword.is_keyword(),
  }
}

fn is_operator(token: &Token) -> bool {
  matches!(
    token,
    Token::Plus
      | Token::Minus
      | Token::Star
      | Token::Slash
      | Token::Percent
      | Token::Caret
      | Token::Assign
      | Token::EqualEqual
      | Token::StrictEqual
      | Token::NotEqual
      | Token::StrictNotEqual
      | Token::Less
      | Token::LessEqual
      | Token::Greater
      | Token::GreaterEqual
      | Token::AndAnd
      | Token::OrOr
      | Token::Bang
      | Token::Dot
  )
}

/// Operators that cannot start an operand, so they can't follow another operator.
fn is_binary_only(token: &Token) -> bool {
  is_operator(token) && !matches!(token, Token::Minus | Token::Bang)
}

/// Whether `{` at `index` starts something that reads like an object literal.
fn opens_object(tokens: &[SpannedToken], index: usize) -> bool {
  match kind(tokens, index + 1) {
    | Token::RightBrace => true,
    | Token::Ident(_) | Token::LitString(_) | Token::LitNumber(_) => {
      matches!(kind(tokens, index + 2), Token::Colon)
    },
    | _ => false,
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateContext {
  /// Call arguments, right after `(`.
  Arguments,
  /// Rest of the line, e.g. after `throw`.
  Line,
}

/// Decides whether the upcoming text should be read as an unquoted template rather than as
/// expressions.
pub fn is_bare_template(tokens: &[SpannedToken], context: TemplateContext) -> bool {
  let first = kind(tokens, 0);

  match (context, first) {
    | (TemplateContext::Arguments, Token::RightParen) => return false,
    | (TemplateContext::Line, Token::Newline | Token::Semicolon | Token::Eof | Token::RightBrace) => {
      return false
    },
    | (_, Token::LeftBrace) if !opens_object(tokens, 0) => return true,
    | (_, token) if !is_expression_start(token) => return true,
    | _ => {},
  }

  let mut depth = 0u32;
  let mut previous: Option<&Token> = None;

  for (index, token) in tokens.iter().enumerate() {
    let token = &token.token;

    // Calls may span lines, so newlines inside arguments are noise.
    let insignificant = context == TemplateContext::Arguments && *token == Token::Newline;

    if depth == 0 && !insignificant {
      if let Token::Error(_) = token {
        return true;
      }

      if let Some(previous) = previous {
        if is_word(previous) && is_word(token) {
          return true;
        }

        if *token == Token::LeftBrace
          && (is_word(previous) || (*previous == Token::Comma && !opens_object(tokens, index)))
        {
          return true;
        }

        if is_operator(previous) && (is_binary_only(token) || token_closes(context, token)) {
          return true;
        }

        if *token == Token::Colon && !is_named_argument(tokens, index) {
          return true;
        }
      }

      if token_closes(context, token) || *token == Token::Eof {
        return false;
      }

      if context == TemplateContext::Line && *token == Token::RightBrace {
        return false;
      }
    }

    match token {
      | Token::LeftParen | Token::LeftBracket | Token::LeftBrace => depth += 1,
      | Token::RightParen | Token::RightBracket | Token::RightBrace => depth = depth.saturating_sub(1),
      | _ => {},
    }

    if !insignificant {
      previous = Some(token);
    }
  }

  false
}

fn token_closes(context: TemplateContext, token: &Token) -> bool {
  match context {
    | TemplateContext::Arguments => *token == Token::RightParen,
    | TemplateContext::Line => matches!(token, Token::Newline | Token::Semicolon | Token::Eof),
  }
}

/// `name:` directly after `(` or `,`, followed by something that isn't a prose-like `{`.
fn is_named_argument(tokens: &[SpannedToken], colon: usize) -> bool {
  let significant = tokens[..colon]
    .iter()
    .rev()
    .filter(|token| token.token != Token::Newline)
    .map(|token| &token.token)
    .take(2)
    .collect::<Vec<_>>();

  let in_position = match significant.as_slice() {
    | [Token::Ident(_)] => true,
    | [Token::Ident(_), Token::Comma] => true,
    | _ => false,
  };

  let value = colon + 1;
  let value_reads_like_text = *kind(tokens, value) == Token::LeftBrace && !opens_object(tokens, value);

  in_position && !value_reads_like_text
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lexer::{tokenize, LexerOptions};
  use crate::source::SourceCode;

  fn tokens(code: &str) -> Vec<SpannedToken> {
    tokenize(&SourceCode::from_str(code), LexerOptions::default()).tokens
  }

  fn arguments(code: &str) -> bool {
    is_bare_template(&tokens(code), TemplateContext::Arguments)
  }

  #[test]
  fn test_is_assignment() {
    assert!(is_assignment(&tokens("a = 1")));
    assert!(is_assignment(&tokens("l.x = 1")));
    assert!(is_assignment(&tokens("a.b[c + 1].d = 1")));
    assert!(!is_assignment(&tokens("a == 1")));
    assert!(!is_assignment(&tokens("a.b(c) = 1")));
    assert!(!is_assignment(&tokens("a.b")));
    assert!(!is_assignment(&tokens("a\n= 1")));
  }

  #[test]
  fn test_is_arrow() {
    assert!(is_arrow(&tokens("(a, b) => a")));
    assert!(is_arrow(&tokens("((a)) =>")));
    assert!(is_arrow(&tokens("()\n=> 1")));
    assert!(!is_arrow(&tokens("(a + b) * 2")));
    assert!(!is_arrow(&tokens("(a")));
  }

  #[test]
  fn test_bare_template_arguments() {
    assert!(arguments("What's your name? >> )"));
    assert!(arguments("Enter your name)"));
    assert!(arguments("Hello {name}!)"));
    assert!(arguments("> next)"));
    assert!(arguments("Time: {t})"));
    assert!(arguments("Done.)"));
    assert!(arguments("name >> )"));
  }

  #[test]
  fn test_expression_arguments() {
    assert!(!arguments(")"));
    assert!(!arguments("\"big\")"));
    assert!(!arguments("a, b + 1)"));
    assert!(!arguments("x => { print(x) })"));
    assert!(!arguments("{ a: 1 }, [1, 2])"));
    assert!(!arguments("name: 'x', age: 3)"));
    assert!(!arguments("-1, !ok)"));
    assert!(!arguments("async (x) => x)"));
    assert!(!arguments("x ?isBoolean)"));
    assert!(!arguments("opts: {})"));
  }

  #[test]
  fn test_bare_template_line() {
    assert!(is_bare_template(&tokens("Something broke {code}\n"), TemplateContext::Line));
    assert!(!is_bare_template(&tokens("'quoted'\n"), TemplateContext::Line));
    assert!(!is_bare_template(&tokens("error\n"), TemplateContext::Line));
  }
}

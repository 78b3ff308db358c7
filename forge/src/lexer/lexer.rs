use tracing::debug;

use super::parser;
use super::{Duration, SpannedToken, StringLiteral, StringPiece, Token};
use crate::errors::{LangError, LexicalError, Wrappable};
use crate::source::{Position, Range, SourceCode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LexerOptions {
  /// Emit whitespace and comments.
  pub include_trivia: bool,
  /// Emit line breaks as [Token::Newline] instead of treating them as whitespace.
  pub emit_newlines: bool,
  /// Stop scanning at the first malformed token.
  pub stop_on_error: bool,
}

impl Default for LexerOptions {
  fn default() -> Self {
    LexerOptions {
      include_trivia: false,
      emit_newlines: true,
      stop_on_error: false,
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LexOutput {
  pub tokens: Vec<SpannedToken>,
  pub errors: Vec<LexicalError>,
}

/// Tokenizes the whole source.
pub fn tokenize(source: &SourceCode, options: LexerOptions) -> LexOutput {
  Lexer::new(source).with_options(options).read_all()
}

pub struct Lexer {
  code: SourceCode,
  pos: Position,
  end: usize,
  options: LexerOptions,
}

impl Lexer {
  pub fn new(code: &SourceCode) -> Self {
    Lexer {
      code: code.clone(),
      pos: Position::start(),
      end: code.len(),
      options: LexerOptions::default(),
    }
  }

  /// Lexes only the `range` of the source, keeping absolute positions.
  pub fn region(code: &SourceCode, range: Range) -> Self {
    Lexer {
      code: code.clone(),
      pos: range.start,
      end: range.end.offset.min(code.len()),
      options: LexerOptions::default(),
    }
  }

  /// Lexes from `start` to the end of the source.
  pub fn starting_at(code: &SourceCode, start: Position) -> Self {
    Lexer::region(code, Range::new(start, code.end_position()))
  }

  pub fn with_options(mut self, options: LexerOptions) -> Self {
    self.options = options;
    self
  }

  /// Strict mode: any lexical error fails the whole run.
  pub fn lex(&mut self) -> Result<Vec<SpannedToken>, LangError> {
    let LexOutput { tokens, errors } = self.read_all();

    if errors.is_empty() {
      Ok(tokens)
    } else {
      Err(LangError::from_list(
        errors
          .into_iter()
          .map(|error| error.wrap(&self.code))
          .collect(),
      ))
    }
  }

  pub fn read_all(&mut self) -> LexOutput {
    let mut errors = vec![];
    let mut tokens = vec![];

    while self.pos.offset < self.end {
      let (token, error) = self.read_next();
      let failed = error.is_some();

      if let Some(error) = error {
        errors.push(error);
      }

      if let Some(token) = self.filter(token) {
        tokens.push(token);
      }

      if failed && self.options.stop_on_error {
        break;
      }
    }

    tokens.push(SpannedToken {
      range: Range::at(self.pos),
      lexeme: String::new(),
      token: Token::Eof,
    });

    debug!(tokens = tokens.len(), errors = errors.len(), "lexed source");

    LexOutput { tokens, errors }
  }

  fn filter(&self, token: SpannedToken) -> Option<SpannedToken> {
    let keep = match &token.token {
      | Token::Newline => self.options.emit_newlines || self.options.include_trivia,
      | trivia if trivia.is_trivia() => self.options.include_trivia,
      | _ => true,
    };

    match token.token {
      | _ if !keep => None,
      | Token::Newline if !self.options.emit_newlines => Some(SpannedToken {
        token: Token::Whitespace,
        ..token
      }),
      | _ => Some(token),
    }
  }

  fn rest(&self) -> &str {
    self
      .code
      .as_str()
      .get(self.pos.offset..self.end)
      .unwrap_or_default()
  }

  /// Consumes `len` bytes and wraps them into a token.
  fn consume(&mut self, len: usize, token: Token) -> SpannedToken {
    let start = self.pos;
    let lexeme = self.rest()[..len].to_string();

    self.pos = start.advance(&lexeme);

    SpannedToken {
      range: Range::new(start, self.pos),
      lexeme,
      token,
    }
  }

  fn read_next(&mut self) -> (SpannedToken, Option<LexicalError>) {
    let rest = self.rest();

    let query = parser::boolean_query(rest)
      .ok()
      .map(|(remaining, token)| (rest.len() - remaining.len(), token));

    if let Some((len, token)) = query {
      return (self.consume(len, token), None);
    }

    let mut chars = rest.chars();
    let first = chars.next().unwrap_or('\0');
    let second = chars.next().unwrap_or('\0');

    match (first, second) {
      | ('\n', _) => (self.consume(1, Token::Newline), None),
      | (' ' | '\t' | '\r', _) => {
        let len = rest
          .find(|ch| !matches!(ch, ' ' | '\t' | '\r'))
          .unwrap_or(rest.len());

        (self.consume(len, Token::Whitespace), None)
      },
      | ('/', '/') => {
        let len = rest.find('\n').unwrap_or(rest.len());
        (self.consume(len, Token::LineComment), None)
      },
      | ('/', '*') => self.read_block_comment("*/"),
      | ('*', '*') => self.read_block_comment("**"),
      | ('"' | '\'', _) => self.read_string(first),
      | (digit, _) if digit.is_ascii_digit() => self.read_number(),
      | ('.', digit) if digit.is_ascii_digit() => self.read_number(),
      | (start, _) if start.is_ascii_alphabetic() || start == '_' => self.read_word(),
      | _ => {
        let operator = parser::operator(rest)
          .ok()
          .map(|(remaining, token)| (rest.len() - remaining.len(), token));

        match operator {
          | Some((len, token)) => (self.consume(len, token), None),
          | None => {
            let token = self.consume(
              first.len_utf8(),
              Token::Error(format!("unexpected character '{first}'")),
            );

            let error = LexicalError::UnexpectedCharacter {
              range: token.range,
              found: first,
            };

            (token, Some(error))
          },
        }
      },
    }
  }

  fn read_word(&mut self) -> (SpannedToken, Option<LexicalError>) {
    let rest = self.rest();

    let word = parser::identifier(rest)
      .ok()
      .map(|(remaining, word)| (rest.len() - remaining.len(), word.to_string()));

    match word {
      | Some((len, word)) => {
        let token = super::keyword(&word).unwrap_or(Token::Ident(word));
        (self.consume(len, token), None)
      },
      | None => {
        let found = rest.chars().next().unwrap_or('\0');
        let token = self.consume(found.len_utf8(), Token::Error("invalid identifier".to_string()));
        let error = LexicalError::UnexpectedCharacter {
          range: token.range,
          found,
        };

        (token, Some(error))
      },
    }
  }

  fn read_number(&mut self) -> (SpannedToken, Option<LexicalError>) {
    let rest = self.rest();

    let raw = parser::number(rest)
      .map(|(_, raw)| raw.to_string())
      .unwrap_or_else(|_| rest[..1].to_string());

    let value = raw.parse::<f64>().unwrap_or(f64::NAN);

    if !value.is_finite() {
      let token = self.consume(raw.len(), Token::Error(format!("invalid number '{raw}'")));
      let error = LexicalError::InvalidNumber {
        range: token.range,
        raw,
      };

      return (token, Some(error));
    }

    let unit = parser::duration_unit(&rest[raw.len()..])
      .ok()
      .map(|(remaining, unit)| (rest.len() - remaining.len(), unit));

    match unit {
      | Some((len, unit)) => {
        let duration = Duration {
          value,
          unit,
          raw: rest[..len].to_string(),
        };

        (self.consume(len, Token::LitDuration(duration)), None)
      },
      | None => (self.consume(raw.len(), Token::LitNumber(value)), None),
    }
  }

  fn read_block_comment(&mut self, closing: &str) -> (SpannedToken, Option<LexicalError>) {
    let rest = self.rest();

    match rest[2..].find(closing) {
      | Some(index) => {
        let len = 2 + index + closing.len();
        (self.consume(len, Token::BlockComment), None)
      },
      | None => {
        let len = rest.len();
        let token = self.consume(len, Token::Error("unterminated block comment".to_string()));
        let error = LexicalError::UnterminatedComment { range: token.range };

        (token, Some(error))
      },
    }
  }

  fn read_string(&mut self, quote: char) -> (SpannedToken, Option<LexicalError>) {
    let rest = self.rest();
    let closing = rest
      .char_indices()
      .skip(1)
      .find(|(index, ch)| *ch == quote && !is_escaped(rest, *index))
      .map(|(index, _)| index);

    match closing {
      | Some(index) => {
        let body_start = self.pos.advance(&rest[..1]);
        let literal = decode_string(&rest[1..index], body_start);

        (self.consume(index + 1, Token::LitString(literal)), None)
      },
      | None => {
        let len = rest.len();
        let token = self.consume(len, Token::Error("unterminated string literal".to_string()));
        let error = LexicalError::UnterminatedString { range: token.range };

        (token, Some(error))
      },
    }
  }
}

/// A character is escaped when an odd run of backslashes directly precedes it.
pub fn is_escaped(text: &str, index: usize) -> bool {
  let run = text[..index]
    .chars()
    .rev()
    .take_while(|ch| *ch == '\\')
    .count();

  run % 2 == 1
}

pub fn unescape(ch: char) -> char {
  match ch {
    | 'n' => '\n',
    | 't' => '\t',
    | 'r' => '\r',
    | other => other,
  }
}

/// Decodes escapes and splits the body into text and `{hole}` pieces. `start` is the absolute
/// position of the body's first character.
fn decode_string(body: &str, start: Position) -> StringLiteral {
  let mut pieces = vec![];
  let mut text = String::new();
  let mut value = String::new();
  let mut chars = body.char_indices().peekable();

  while let Some((index, ch)) = chars.next() {
    match ch {
      | '\\' => {
        if let Some((_, escaped)) = chars.next() {
          let decoded = unescape(escaped);
          text.push(decoded);
          value.push(decoded);
        }
      },
      | '{' => match matching_brace(body, index) {
        | Some(close) => {
          if !text.is_empty() {
            pieces.push(StringPiece::Text(std::mem::take(&mut text)));
          }

          let hole_start = start.advance(&body[..index + 1]);
          let hole_end = hole_start.advance(&body[index + 1..close]);

          pieces.push(StringPiece::Hole(Range::new(hole_start, hole_end)));
          value.push_str(&body[index..=close]);

          while let Some((next, _)) = chars.peek() {
            if *next > close {
              break;
            }

            chars.next();
          }
        },
        | None => {
          text.push(ch);
          value.push(ch);
        },
      },
      | _ => {
        text.push(ch);
        value.push(ch);
      },
    }
  }

  if !text.is_empty() || pieces.is_empty() {
    pieces.push(StringPiece::Text(text));
  }

  StringLiteral { value, pieces }
}

/// Finds the `}` closing the unescaped `{` at `open`, honouring nesting.
pub fn matching_brace(text: &str, open: usize) -> Option<usize> {
  let mut depth = 0;

  for (index, ch) in text[open..].char_indices() {
    let index = open + index;

    if is_escaped(text, index) {
      continue;
    }

    match ch {
      | '{' => depth += 1,
      | '}' => {
        depth -= 1;

        if depth == 0 {
          return Some(index);
        }
      },
      | _ => {},
    }
  }

  None
}

#[cfg(test)]
mod tests {
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::lexer::DurationUnit;

  fn kinds(code: &str) -> Vec<Token> {
    tokenize(&SourceCode::from_str(code), LexerOptions::default())
      .tokens
      .into_iter()
      .map(|token| token.token)
      .collect()
  }

  fn ident(name: &str) -> Token {
    Token::Ident(name.to_string())
  }

  #[test]
  fn test_round_trip() {
    let code = indoc! {r#"
      // greeting
      let name = inp("name")
      ** banner **
      c.limit = 1.5s /* inline */ + 20
      if (x ?isBoolean.t) { console.text.var("hi {name}\n") }
    "#};

    let source = SourceCode::from_str(code);
    let options = LexerOptions {
      include_trivia: true,
      ..LexerOptions::default()
    };

    let output = tokenize(&source, options);
    assert!(output.errors.is_empty());

    let joined = output
      .tokens
      .iter()
      .map(|token| token.lexeme.as_str())
      .collect::<String>();

    assert_eq!(joined, code);
  }

  #[test]
  fn test_longest_match() {
    assert_eq!(
      kinds("a === b == c = d"),
      vec![
        ident("a"),
        Token::StrictEqual,
        ident("b"),
        Token::EqualEqual,
        ident("c"),
        Token::Assign,
        ident("d"),
        Token::Eof,
      ]
    );
  }

  #[test]
  fn test_durations() {
    let tokens = kinds("5ms 2m 1.5h 3 min");

    assert_eq!(
      tokens[0],
      Token::LitDuration(Duration {
        value: 5.0,
        unit: DurationUnit::Milliseconds,
        raw: "5ms".to_string(),
      })
    );
    assert!(matches!(&tokens[1], Token::LitDuration(d) if d.millis() == 120_000.0));
    assert!(matches!(&tokens[2], Token::LitDuration(d) if d.millis() == 5_400_000.0));
    assert_eq!(tokens[3], Token::LitNumber(3.0));
    assert_eq!(tokens[4], ident("min"));
  }

  #[test]
  fn test_boolean_queries() {
    assert_eq!(
      kinds("x ?isBoolean !isBoolean.f !y isBooleanX"),
      vec![
        ident("x"),
        Token::QueryIsBoolean,
        Token::NegatedIsBoolean,
        Token::Dot,
        ident("f"),
        Token::Bang,
        ident("y"),
        ident("isBooleanX"),
        Token::Eof,
      ]
    );
  }

  #[test]
  fn test_bare_question_mark_is_error() {
    let output = tokenize(&SourceCode::from_str("a ? b"), LexerOptions::default());

    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.errors[0].code(), "LEX_UNEXPECTED_CHARACTER");
    assert_eq!(output.tokens.len(), 4);
  }

  #[test]
  fn test_keywords_on_full_extent() {
    assert_eq!(
      kinds("forEach forEachX let-it"),
      vec![
        Token::ForEachKw,
        ident("forEachX"),
        ident("let-it"),
        Token::Eof
      ]
    );
  }

  #[test]
  fn test_string_escapes() {
    let tokens = kinds(r#"'it\'s' "a\\" "x\ny""#);

    assert!(matches!(&tokens[0], Token::LitString(s) if s.value == "it's"));
    assert!(matches!(&tokens[1], Token::LitString(s) if s.value == "a\\"));
    assert!(matches!(&tokens[2], Token::LitString(s) if s.value == "x\ny"));
  }

  #[test]
  fn test_multiline_string() {
    let tokens = kinds("'one\ntwo'");

    assert!(matches!(&tokens[0], Token::LitString(s) if s.value == "one\ntwo"));
    assert_eq!(tokens[1], Token::Eof);
  }

  #[test]
  fn test_string_holes() {
    let source = SourceCode::from_str("'hi {name}!'");
    let output = tokenize(&source, LexerOptions::default());

    let literal = match &output.tokens[0].token {
      | Token::LitString(literal) => literal.clone(),
      | token => panic!("expected string, found {token:?}"),
    };

    assert!(literal.has_holes());
    assert_eq!(literal.pieces.len(), 3);

    match &literal.pieces[1] {
      | StringPiece::Hole(range) => assert_eq!(source.slice(*range), "name"),
      | piece => panic!("expected hole, found {piece:?}"),
    }
  }

  #[test]
  fn test_escaped_brace_is_text() {
    let tokens = kinds(r"'\{x\}'");

    assert!(matches!(&tokens[0], Token::LitString(s) if !s.has_holes() && s.value == "{x}"));
  }

  #[test]
  fn test_recovery() {
    let output = tokenize(&SourceCode::from_str("a @ b\n'open"), LexerOptions::default());
    let codes = output.errors.iter().map(|e| e.code()).collect::<Vec<_>>();

    assert_eq!(codes, vec!["LEX_UNEXPECTED_CHARACTER", "LEX_UNTERMINATED_STRING"]);
    assert!(matches!(output.tokens[2].token, Token::Ident(_)));
  }

  #[test]
  fn test_stop_on_error() {
    let options = LexerOptions {
      stop_on_error: true,
      ..LexerOptions::default()
    };

    let output = tokenize(&SourceCode::from_str("a @ b # c"), options);

    assert_eq!(output.errors.len(), 1);
    assert_eq!(output.tokens.last().map(|t| t.token.clone()), Some(Token::Eof));
  }

  #[test]
  fn test_unterminated_comment() {
    let output = tokenize(&SourceCode::from_str("a /* never"), LexerOptions::default());

    assert_eq!(output.errors[0].code(), "LEX_UNTERMINATED_COMMENT");
  }

  #[test]
  fn test_positions() {
    let output = tokenize(&SourceCode::from_str("a\n  bb"), LexerOptions::default());
    let bb = &output.tokens[2];

    assert_eq!(bb.range.start, Position::new(4, 2, 3));
    assert_eq!(bb.range.end, Position::new(6, 2, 5));
  }

  #[test]
  fn test_region_keeps_absolute_positions() {
    let source = SourceCode::from_str("xx yy zz");
    let start = source.position_at(3);
    let output = Lexer::starting_at(&source, start).read_all();

    assert_eq!(output.tokens[0].range.start.offset, 3);
    assert_eq!(output.tokens[0].token, ident("yy"));
  }

  #[test]
  fn test_strict_lex() {
    let source = SourceCode::from_str("let a = 'x");

    assert!(Lexer::new(&source).lex().is_err());
    assert!(Lexer::new(&SourceCode::from_str("let a = 1")).lex().is_ok());
  }
}

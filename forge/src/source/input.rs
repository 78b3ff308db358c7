use std::rc::Rc;

use crate::errors::ParseError;
use crate::lexer::{SpannedToken, Token};
use crate::source::{Position, Range, SourceCode};

/// Persistent cursor over the token stream. Every move returns a new [Input], so throwing one away
/// is a lossless rewind.
#[derive(PartialEq, Debug, Clone)]
pub struct Input {
  raw: Rc<RawInput>,
  cursor: usize,
  /// Depth of `(`, `[` and object literal groups; newlines are insignificant inside them.
  nesting: u32,
  errors: Rc<Vec<ParseError>>,
}

#[derive(PartialEq, Debug, Clone)]
struct RawInput {
  source: SourceCode,
  tokens: Vec<SpannedToken>,
}

impl RawInput {
  fn new(source: SourceCode, tokens: Vec<SpannedToken>) -> Self {
    let mut tokens = tokens
      .into_iter()
      .filter(|token| !token.token.is_trivia())
      .collect::<Vec<_>>();

    if !matches!(tokens.last(), Some(SpannedToken { token: Token::Eof, .. })) {
      let end = tokens
        .last()
        .map(|token| token.range.end)
        .unwrap_or_else(|| source.end_position());

      tokens.push(SpannedToken {
        range: Range::at(end),
        lexeme: String::new(),
        token: Token::Eof,
      });
    }

    RawInput { source, tokens }
  }
}

impl Input {
  pub fn new(source: SourceCode, tokens: Vec<SpannedToken>) -> Self {
    Input {
      raw: Rc::new(RawInput::new(source, tokens)),
      cursor: 0,
      nesting: 0,
      errors: Rc::new(vec![]),
    }
  }

  /// Same as [Input::new], but starts with errors found before parsing, e.g. by the lexer.
  pub fn with_errors(source: SourceCode, tokens: Vec<SpannedToken>, errors: Vec<ParseError>) -> Self {
    Input {
      errors: Rc::new(errors),
      ..Input::new(source, tokens)
    }
  }

  /// Swaps the remaining token stream for `tokens`, which were lexed from the source starting at
  /// some later offset. Lexer errors recorded at or after `discard_from` are dropped, since they
  /// belonged to text that has been reinterpreted.
  pub fn resume_with(&self, tokens: Vec<SpannedToken>, lex_errors: Vec<ParseError>, discard_from: usize) -> Input {
    let mut errors = self
      .errors
      .iter()
      .filter(|error| !matches!(error, ParseError::Lexical(_)) || error.range().start.offset < discard_from)
      .cloned()
      .collect::<Vec<_>>();

    errors.extend(lex_errors);

    Input {
      raw: Rc::new(RawInput::new(self.raw.source.clone(), tokens)),
      cursor: 0,
      nesting: self.nesting,
      errors: Rc::new(errors),
    }
  }

  pub fn next(&self) -> Input {
    let cursor = self.skip_newlines_inside_groups();

    Input {
      raw: Rc::clone(&self.raw),
      cursor: (cursor + 1).min(self.raw.tokens.len() - 1),
      nesting: self.nesting,
      errors: Rc::clone(&self.errors),
    }
  }

  /// Current significant token.
  pub fn read(&self) -> Token {
    self.current().token.clone()
  }

  pub fn current(&self) -> &SpannedToken {
    &self.raw.tokens[self.skip_newlines_inside_groups()]
  }

  /// Current token even if it's an insignificant newline.
  pub fn read_forced(&self) -> Token {
    self.raw.tokens[self.cursor].token.clone()
  }

  fn skip_newlines_inside_groups(&self) -> usize {
    let mut cursor = self.cursor;

    if self.nesting > 0 {
      while let Token::Newline = self.raw.tokens[cursor].token {
        cursor += 1;
      }
    }

    cursor.min(self.raw.tokens.len() - 1)
  }

  /// Skips newlines regardless of the nesting.
  pub fn skip_newlines(&self) -> Input {
    let mut input = self.clone();

    while let Token::Newline = input.read_forced() {
      input.cursor += 1;
    }

    input
  }

  /// Tokens from the cursor onwards, newlines included.
  pub fn rest(&self) -> &[SpannedToken] {
    &self.raw.tokens[self.cursor..]
  }

  /// Token consumed right before the cursor, if any.
  pub fn previous(&self) -> Option<&SpannedToken> {
    self.cursor.checked_sub(1).map(|index| &self.raw.tokens[index])
  }

  pub fn enter_group(&self) -> Input {
    self.with_nesting(self.nesting + 1)
  }

  pub fn exit_group(&self) -> Input {
    self.with_nesting(self.nesting.saturating_sub(1))
  }

  pub fn nesting(&self) -> u32 {
    self.nesting
  }

  pub fn with_nesting(&self, nesting: u32) -> Input {
    Input {
      raw: Rc::clone(&self.raw),
      cursor: self.cursor,
      nesting,
      errors: Rc::clone(&self.errors),
    }
  }

  /// Records a recovered error.
  pub fn with_error(&self, error: ParseError) -> Input {
    let mut errors = (*self.errors).clone();
    errors.push(error);

    Input {
      raw: Rc::clone(&self.raw),
      cursor: self.cursor,
      nesting: self.nesting,
      errors: Rc::new(errors),
    }
  }

  pub fn errors(&self) -> Vec<ParseError> {
    (*self.errors).clone()
  }

  pub fn source(&self) -> &SourceCode {
    &self.raw.source
  }

  /// Whether some token of the current stream starts exactly at `offset`.
  pub fn has_token_at(&self, offset: usize) -> bool {
    self
      .raw
      .tokens
      .binary_search_by_key(&offset, |token| token.range.start.offset)
      .is_ok()
  }

  pub fn is_eof(&self) -> bool {
    matches!(self.read(), Token::Eof)
  }

  pub fn range(&self) -> Range {
    self.current().range
  }

  pub fn pos(&self) -> Position {
    self.range().start
  }

  /// End of the last consumed token, used to close node ranges.
  pub fn pos_end(&self) -> Position {
    self
      .previous()
      .map(|token| token.range.end)
      .unwrap_or_else(|| self.pos())
  }

  /// Range from `start` to the end of the last consumed token.
  pub fn range_from(&self, start: Position) -> Range {
    Range::new(start, self.pos_end().max(start))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lexer::{tokenize, LexerOptions};

  fn input(code: &str) -> Input {
    let source = SourceCode::from_str(code);
    let output = tokenize(&source, LexerOptions::default());

    Input::new(source, output.tokens)
  }

  #[test]
  fn test_rewind_is_lossless() {
    let start = input("a = 1");
    let moved = start.next().next();

    assert_eq!(moved.read(), Token::LitNumber(1.0));
    assert_eq!(start.read(), Token::Ident("a".to_string()));
  }

  #[test]
  fn test_newlines_inside_groups() {
    let start = input("(\n1\n)");
    let inner = start.next();

    assert_eq!(inner.read(), Token::Newline);
    assert_eq!(inner.enter_group().read(), Token::LitNumber(1.0));
    assert_eq!(inner.enter_group().next().read(), Token::RightParen);
  }

  #[test]
  fn test_has_token_at() {
    let start = input("ab = 'x'");

    assert!(start.has_token_at(0));
    assert!(start.has_token_at(5));
    assert!(!start.has_token_at(1));
    assert!(!start.has_token_at(6));
  }

  #[test]
  fn test_next_stops_at_eof() {
    let start = input("a");
    let end = start.next().next().next();

    assert!(end.is_eof());
  }
}

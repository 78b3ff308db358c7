use ariadne::{Label, Report, ReportKind};
use thiserror::Error;

use super::*;
use crate::lexer::Token;
use crate::source::Range;

#[derive(PartialEq, Debug, Clone, Error)]
pub enum ParseError {
  #[error("expected {expected}, but instead found '{found}'")]
  Expected {
    range: Range,
    expected: String,
    found: Token,
  },
  #[error("found unexpected token '{found}'")]
  UnexpectedToken { range: Range, found: Token },
  #[error("{message}")]
  InvalidDirective { range: Range, message: String },
  #[error("invalid assignment target")]
  InvalidAssignment { range: Range },
  #[error("expected '{{' to open the {context} body")]
  MissingBlock { range: Range, context: &'static str },
  #[error("{0}")]
  Lexical(LexicalError),
}

impl ParseError {
  pub fn expected(range: Range, expected: impl Into<String>, found: Token) -> Self {
    ParseError::Expected {
      range,
      expected: expected.into(),
      found,
    }
  }

  pub fn range(&self) -> Range {
    match self {
      | ParseError::Expected { range, .. }
      | ParseError::UnexpectedToken { range, .. }
      | ParseError::InvalidDirective { range, .. }
      | ParseError::InvalidAssignment { range }
      | ParseError::MissingBlock { range, .. } => *range,
      | ParseError::Lexical(error) => error.range(),
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      | ParseError::Expected { .. } => "PARSE_EXPECTED",
      | ParseError::UnexpectedToken { .. } => "PARSE_UNEXPECTED_TOKEN",
      | ParseError::InvalidDirective { .. } => "PARSE_INVALID_DIRECTIVE",
      | ParseError::InvalidAssignment { .. } => "PARSE_INVALID_ASSIGNMENT",
      | ParseError::MissingBlock { .. } => "PARSE_MISSING_BLOCK",
      | ParseError::Lexical(error) => error.code(),
    }
  }

  pub fn to_diagnostic(&self) -> Diagnostic {
    Diagnostic::error(self.code(), self.to_string(), self.range())
  }
}

impl From<LexicalError> for ParseError {
  fn from(error: LexicalError) -> Self {
    ParseError::Lexical(error)
  }
}

impl Wrappable for ParseError {
  type Wrapper = LangError;

  fn wrap(self, source: &SourceCode) -> LangError {
    LangError::Parser(source.clone(), self)
  }
}

impl<'a> Reportable<'a> for ParseError {
  fn report(&'a self, source: &'a SourceCode) -> ReportBuilder<'a> {
    if let ParseError::Lexical(error) = self {
      return error.report(source);
    }

    let source = source.file_name();
    let range = self.range();

    Report::build(ReportKind::Error, source, range.start.offset)
      .with_code(self.code())
      .with_message(self.to_string())
      .with_label(Label::new((source, range.offsets())))
  }
}

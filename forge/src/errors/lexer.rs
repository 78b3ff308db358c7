use ariadne::{Label, Report, ReportKind};
use thiserror::Error;

use super::*;
use crate::source::Range;

#[derive(PartialEq, Debug, Clone, Error)]
pub enum LexicalError {
  #[error("unterminated string literal")]
  UnterminatedString { range: Range },
  #[error("unterminated block comment")]
  UnterminatedComment { range: Range },
  #[error("invalid number literal '{raw}'")]
  InvalidNumber { range: Range, raw: String },
  #[error("unexpected character '{found}'")]
  UnexpectedCharacter { range: Range, found: char },
}

impl LexicalError {
  pub fn range(&self) -> Range {
    match self {
      | LexicalError::UnterminatedString { range }
      | LexicalError::UnterminatedComment { range }
      | LexicalError::InvalidNumber { range, .. }
      | LexicalError::UnexpectedCharacter { range, .. } => *range,
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      | LexicalError::UnterminatedString { .. } => "LEX_UNTERMINATED_STRING",
      | LexicalError::UnterminatedComment { .. } => "LEX_UNTERMINATED_COMMENT",
      | LexicalError::InvalidNumber { .. } => "LEX_INVALID_NUMBER",
      | LexicalError::UnexpectedCharacter { .. } => "LEX_UNEXPECTED_CHARACTER",
    }
  }

  pub fn to_diagnostic(&self) -> Diagnostic {
    Diagnostic::error(self.code(), self.to_string(), self.range())
  }
}

impl Wrappable for LexicalError {
  type Wrapper = LangError;

  fn wrap(self, source: &SourceCode) -> LangError {
    LangError::Lexer(source.clone(), self)
  }
}

impl<'a> Reportable<'a> for LexicalError {
  fn report(&'a self, source: &'a SourceCode) -> ReportBuilder<'a> {
    let source = source.file_name();
    let range = self.range();

    Report::build(ReportKind::Error, source, range.start.offset)
      .with_code(self.code())
      .with_message(self.to_string())
      .with_label(Label::new((source, range.offsets())))
  }
}

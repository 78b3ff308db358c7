use ariadne::Source;
use thiserror::Error;

use super::*;
use crate::source::SourceCode;

#[derive(Debug, Clone, Error)]
pub enum LangError {
  #[error("{1}")]
  Lexer(SourceCode, LexicalError),
  #[error("{1}")]
  Parser(SourceCode, ParseError),
  #[error("{1}")]
  Analyzer(SourceCode, Diagnostic),
  #[error("{1}")]
  Runtime(SourceCode, RuntimeError),
  #[error("couldn't read '{path}': {message}")]
  Io { path: String, message: String },
  #[error("found {} errors", .0.len())]
  List(Vec<LangError>),
}

impl LangError {
  /// Collapses a list of errors, unwrapping single-item lists.
  pub fn from_list(mut errors: Vec<LangError>) -> LangError {
    if errors.len() == 1 {
      errors.remove(0)
    } else {
      LangError::List(errors)
    }
  }

  /// Renders the error to stderr as an annotated source report.
  pub fn eprint(&self) {
    let (source, report) = match self {
      | LangError::Lexer(source, error) => (source, error.report(source)),
      | LangError::Parser(source, error) => (source, error.report(source)),
      | LangError::Analyzer(source, diagnostic) => (source, diagnostic.report(source)),
      | LangError::Runtime(source, error) => (source, error.report(source)),
      | LangError::Io { .. } => {
        eprintln!("{self}");
        return;
      },
      | LangError::List(errors) => {
        errors.iter().for_each(LangError::eprint);
        return;
      },
    };

    let cache = (source.file_name(), Source::from(source.as_str()));

    if report.finish().eprint(cache).is_err() {
      eprintln!("{self}");
    }
  }
}

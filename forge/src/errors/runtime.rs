use std::fmt;

use ariadne::{Label, Report, ReportKind};
use thiserror::Error;

use super::*;
use crate::source::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
  /// Raised by `throw`.
  Runtime,
  Unsupported,
  Type,
  Name,
  Module,
  Permission,
  Io,
  Net,
}

impl ErrorCode {
  pub fn as_str(&self) -> &'static str {
    match self {
      | ErrorCode::Runtime => "E_RUNTIME",
      | ErrorCode::Unsupported => "E_UNSUPPORTED",
      | ErrorCode::Type => "E_TYPE",
      | ErrorCode::Name => "E_NAME",
      | ErrorCode::Module => "E_MODULE",
      | ErrorCode::Permission => "E_PERMISSION",
      | ErrorCode::Io => "E_IO",
      | ErrorCode::Net => "E_NET",
    }
  }
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A genuine evaluation failure. Control flow never travels through this type.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct RuntimeError {
  pub code: ErrorCode,
  pub message: String,
  pub range: Option<Range>,
}

impl RuntimeError {
  pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
    RuntimeError {
      code,
      message: message.into(),
      range: None,
    }
  }

  pub fn runtime(message: impl Into<String>) -> Self {
    RuntimeError::new(ErrorCode::Runtime, message)
  }

  pub fn unsupported(message: impl Into<String>) -> Self {
    RuntimeError::new(ErrorCode::Unsupported, message)
  }

  pub fn type_error(message: impl Into<String>) -> Self {
    RuntimeError::new(ErrorCode::Type, message)
  }

  pub fn name(message: impl Into<String>) -> Self {
    RuntimeError::new(ErrorCode::Name, message)
  }

  pub fn module(message: impl Into<String>) -> Self {
    RuntimeError::new(ErrorCode::Module, message)
  }

  pub fn permission(message: impl Into<String>) -> Self {
    RuntimeError::new(ErrorCode::Permission, message)
  }

  pub fn io(message: impl Into<String>) -> Self {
    RuntimeError::new(ErrorCode::Io, message)
  }

  pub fn net(message: impl Into<String>) -> Self {
    RuntimeError::new(ErrorCode::Net, message)
  }

  /// Attaches a range unless a more precise one was already recorded deeper down.
  pub fn with_range(mut self, range: Range) -> Self {
    if self.range.is_none() {
      self.range = Some(range);
    }

    self
  }
}

impl Wrappable for RuntimeError {
  type Wrapper = LangError;

  fn wrap(self, source: &SourceCode) -> LangError {
    LangError::Runtime(source.clone(), self)
  }
}

impl<'a> Reportable<'a> for RuntimeError {
  fn report(&'a self, source: &'a SourceCode) -> ReportBuilder<'a> {
    let source = source.file_name();
    let offsets = self.range.map(|range| range.offsets()).unwrap_or(0..0);

    let report = Report::build(ReportKind::Error, source, offsets.start)
      .with_code(self.code.as_str())
      .with_message(&self.message);

    if self.range.is_some() {
      report.with_label(Label::new((source, offsets)))
    } else {
      report
    }
  }
}

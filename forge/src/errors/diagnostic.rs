use std::fmt;

use ariadne::{Label, Report, ReportKind};

use super::*;
use crate::source::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
  Error,
  Warning,
  Info,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      | Severity::Error => "error",
      | Severity::Warning => "warning",
      | Severity::Info => "info",
    };

    write!(f, "{text}")
  }
}

/// The record every stage reports problems with, regardless of where they were found.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
  pub severity: Severity,
  pub message: String,
  pub range: Range,
  pub code: Option<String>,
}

impl Diagnostic {
  pub fn new(severity: Severity, code: &str, message: impl Into<String>, range: Range) -> Self {
    Diagnostic {
      severity,
      message: message.into(),
      range,
      code: Some(code.to_string()),
    }
  }

  pub fn error(code: &str, message: impl Into<String>, range: Range) -> Self {
    Diagnostic::new(Severity::Error, code, message, range)
  }

  pub fn warning(code: &str, message: impl Into<String>, range: Range) -> Self {
    Diagnostic::new(Severity::Warning, code, message, range)
  }

  pub fn info(code: &str, message: impl Into<String>, range: Range) -> Self {
    Diagnostic::new(Severity::Info, code, message, range)
  }

  pub fn is_error(&self) -> bool {
    self.severity == Severity::Error
  }

  pub fn has_code(&self, code: &str) -> bool {
    self.code.as_deref() == Some(code)
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.code {
      | Some(code) => write!(f, "{}[{code}] {}: {}", self.severity, self.range, self.message),
      | None => write!(f, "{} {}: {}", self.severity, self.range, self.message),
    }
  }
}

impl<'a> Reportable<'a> for Diagnostic {
  fn report(&'a self, source: &'a SourceCode) -> ReportBuilder<'a> {
    let source = source.file_name();

    let kind = match self.severity {
      | Severity::Error => ReportKind::Error,
      | Severity::Warning => ReportKind::Warning,
      | Severity::Info => ReportKind::Advice,
    };

    let report = Report::build(kind, source, self.range.start.offset)
      .with_message(&self.message)
      .with_label(Label::new((source, self.range.offsets())));

    match &self.code {
      | Some(code) => report.with_code(code),
      | None => report,
    }
  }
}

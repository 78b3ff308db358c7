use std::ops::Range as Offsets;

pub use diagnostic::*;
pub use language::*;
pub use lexer::*;
pub use parser::*;
pub use runtime::*;

use crate::source::SourceCode;

mod diagnostic;
mod language;
mod lexer;
mod parser;
mod runtime;

/// This trait allows for wrapping a given error in a more generic error.
pub trait Wrappable {
  type Wrapper;

  fn wrap(self, source: &SourceCode) -> Self::Wrapper;
}

pub type ReportBuilder<'a> = ariadne::ReportBuilder<(&'a str, Offsets<usize>)>;

/// Errors that know how to render themselves against the source they were found in.
pub trait Reportable<'a> {
  fn report(&'a self, source: &'a SourceCode) -> ReportBuilder<'a>;
}

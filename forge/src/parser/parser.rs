use tracing::debug;

use super::statement;
use crate::ast::Program;
use crate::errors::*;
use crate::lexer::{tokenize, LexerOptions, SpannedToken};
use crate::source::{Input, SourceCode};

/// Best-effort program plus every error recovered while building it, ordered by position.
#[derive(PartialEq, Debug, Clone)]
pub struct ParseOutput {
  pub program: Program,
  pub errors: Vec<ParseError>,
}

impl ParseOutput {
  pub fn is_ok(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn diagnostics(&self) -> Vec<Diagnostic> {
    self.errors.iter().map(ParseError::to_diagnostic).collect()
  }

  /// Fails with every collected error when there are any.
  pub fn into_result(self, source: &SourceCode) -> Result<Program, LangError> {
    if self.errors.is_empty() {
      Ok(self.program)
    } else {
      Err(LangError::from_list(
        self
          .errors
          .into_iter()
          .map(|error| error.wrap(source))
          .collect(),
      ))
    }
  }
}

pub fn parse_tokens(tokens: Vec<SpannedToken>, source: &SourceCode) -> ParseOutput {
  parse_input(Input::new(source.clone(), tokens))
}

/// Lexes and parses `source`; lexer errors are reported alongside parse errors.
pub fn parse_source(source: &SourceCode) -> ParseOutput {
  let lexed = tokenize(source, LexerOptions::default());
  let errors = lexed.errors.into_iter().map(ParseError::from).collect();

  parse_input(Input::with_errors(source.clone(), lexed.tokens, errors))
}

fn parse_input(input: Input) -> ParseOutput {
  let (program, input) = statement::parse_program(input);

  let mut errors = input.errors();
  errors.sort_by_key(|error| error.range().start.offset);

  debug!(
    statements = program.body.len(),
    errors = errors.len(),
    "parsed program"
  );

  ParseOutput { program, errors }
}

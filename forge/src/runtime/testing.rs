use std::rc::Rc;

use super::*;
use crate::errors::{ErrorCode, RuntimeError};
use crate::parser::parse_source;
use crate::source::SourceCode;

/// Evaluates `code` against a recording host, returning the outcome and the printed lines.
pub async fn run_with_config(code: &str, config: RuntimeConfig) -> (Result<Value, RuntimeError>, Vec<String>) {
  let host = Rc::new(RecordingHost::new());
  let interpreter = Interpreter::new(host.clone(), config);
  let parsed = parse_source(&SourceCode::from_str(code));

  assert!(parsed.errors.is_empty(), "parse errors: {:?}", parsed.errors);

  let result = interpreter.evaluate(&parsed.program).await;

  (result, host.output())
}

pub async fn run_result(code: &str) -> (Result<Value, RuntimeError>, Vec<String>) {
  run_with_config(code, RuntimeConfig::default()).await
}

/// Printed lines of a program that must not fail.
pub async fn run(code: &str) -> Vec<String> {
  let (result, output) = run_result(code).await;

  if let Err(error) = result {
    panic!("evaluation failed: {error}");
  }

  output
}

pub async fn eval(code: &str) -> Result<Value, RuntimeError> {
  run_result(code).await.0
}

pub async fn error_code(code: &str) -> ErrorCode {
  match eval(code).await {
    | Ok(value) => panic!("expected an error, got {value}"),
    | Err(error) => error.code,
  }
}

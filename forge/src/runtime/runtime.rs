use std::rc::Rc;

use tracing::{debug, info_span, warn};

use super::value::{Module, Value};
use super::{HostServices, Interpreter, RuntimeConfig, StdHost};
use crate::analyzer::{analyze_program, AnalysisOutput, AnalyzerOptions};
use crate::ast::Program;
use crate::errors::{LangError, Wrappable};
use crate::parser::parse_source;
use crate::source::SourceCode;

/// Ties the stages together: parse, analyze, then evaluate in a global scope that outlives a
/// single source, which is what the REPL relies on.
pub struct Runtime {
  pub interpreter: Interpreter,
  pub options: AnalyzerOptions,
}

/// A parsed program together with its advisory analysis.
#[derive(Debug, Clone)]
pub struct Checked {
  pub program: Program,
  pub analysis: AnalysisOutput,
}

impl Checked {
  /// Analyzer errors wrapped for reporting. Warnings and infos are left out.
  pub fn errors(&self, source: &SourceCode) -> Vec<LangError> {
    self
      .analysis
      .errors()
      .map(|diagnostic| LangError::Analyzer(source.clone(), diagnostic.clone()))
      .collect()
  }
}

impl Runtime {
  pub fn new() -> Runtime {
    Self::with_host(Rc::new(StdHost::new()), RuntimeConfig::default())
  }

  pub fn with_host(host: Rc<dyn HostServices>, config: RuntimeConfig) -> Runtime {
    Runtime {
      interpreter: Interpreter::new(host, config),
      options: AnalyzerOptions::default(),
    }
  }

  /// Registers a host module, e.g. `File`, for both the analyzer and the evaluator.
  pub fn register_module(&mut self, module: Module) {
    self.options.globals.insert(module.name.clone());
    self.interpreter.register_module(module);
  }

  /// Parses and analyzes. Parse errors fail, analysis diagnostics never do.
  pub fn check(&self, source: &SourceCode) -> Result<Checked, LangError> {
    let _span = info_span!("check", file = source.file_name()).entered();

    let program = parse_source(source).into_result(source)?;
    let analysis = analyze_program(&program, self.options.clone());

    Ok(Checked { program, analysis })
  }

  /// Runs a source end to end. Analyzer errors are logged but do not stop evaluation, since the
  /// evaluator enforces everything that matters at runtime.
  pub async fn run(&self, source: &SourceCode) -> Result<Value, LangError> {
    let checked = self.check(source)?;

    for diagnostic in checked.analysis.errors() {
      warn!(code = ?diagnostic.code, range = %diagnostic.range, "{}", diagnostic.message);
    }

    self.evaluate(&checked.program, source).await
  }

  pub async fn evaluate(&self, program: &Program, source: &SourceCode) -> Result<Value, LangError> {
    debug!(file = source.file_name(), "running");

    self
      .interpreter
      .evaluate(program)
      .await
      .map_err(|error| error.wrap(source))
  }

  /// Evaluates a snippet, e.g. `1 + 2`.
  pub async fn eval(&self, code: &str) -> Result<Value, LangError> {
    self.run(&SourceCode::from_str(code)).await
  }
}

impl Default for Runtime {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::errors::ErrorCode;
  use crate::runtime::RecordingHost;

  fn recording() -> (Rc<RecordingHost>, Runtime) {
    let host = Rc::new(RecordingHost::new());
    let runtime = Runtime::with_host(host.clone(), RuntimeConfig::default());

    (host, runtime)
  }

  #[tokio::test]
  async fn test_state_survives_between_runs() {
    let (host, runtime) = recording();

    assert!(runtime.eval("let x = 40").await.is_ok());
    assert_eq!(runtime.eval("x + 2").await.ok(), Some(Value::Number(42.0)));
    assert!(runtime.eval("print(x)").await.is_ok());
    assert_eq!(host.output(), vec!["40"]);
  }

  #[tokio::test]
  async fn test_parse_errors_fail() {
    let (_, runtime) = recording();

    assert!(runtime.eval("let = 1").await.is_err());
  }

  #[tokio::test]
  async fn test_runtime_errors_are_wrapped() {
    let (_, runtime) = recording();

    match runtime.eval("throw 'nope'").await {
      | Err(LangError::Runtime(_, error)) => {
        assert_eq!(error.code, ErrorCode::Runtime);
        assert_eq!(error.message, "nope");
      },
      | other => panic!("expected runtime error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_register_module() {
    let (host, mut runtime) = recording();

    runtime.register_module(Module {
      name: "Sys".to_string(),
      members: BTreeMap::from([("version".to_string(), Value::string("1.0"))]),
    });

    let checked = runtime
      .check(&SourceCode::from_str("print(Sys.version)"))
      .ok();

    assert_eq!(checked.map(|checked| checked.analysis.has_errors()), Some(false));
    assert!(runtime.eval("print(Sys.version)").await.is_ok());
    assert_eq!(host.output(), vec!["1.0"]);
  }
}

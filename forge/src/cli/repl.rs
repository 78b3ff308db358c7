use std::rc::Rc;

use super::runtime_config;
use crate::runtime::{HostServices, Runtime, StdHost, Value};

/// Reads a statement per line and prints the value of expressions. A trailing `\` continues the
/// input on the next line. Lines come from the same host reader `inp` uses, so input typed ahead
/// is never split between two buffers.
pub async fn repl() {
  let host = Rc::new(StdHost::new());
  let runtime = Runtime::with_host(host.clone(), runtime_config());

  loop {
    // Read
    let line = match read_statement(host.as_ref()).await {
      | Ok(line) => line,
      | Err(ReadError::Eof) => break,
      | Err(ReadError::Empty) => continue,
    };

    // Eval
    match runtime.eval(&line).await {
      // Print
      | Ok(Value::Null) => {},
      | Ok(value) => println!("{}", value.to_repr()),
      | Err(error) => error.eprint(),
    }
  }
}

#[derive(Debug, PartialEq)]
enum ReadError {
  Eof,
  Empty,
}

async fn read_statement(host: &dyn HostServices) -> Result<String, ReadError> {
  let mut line = host.input("> ").await.map_err(|_| ReadError::Eof)?;

  while line.ends_with('\\') {
    let rest = host.input(". ").await.map_err(|_| ReadError::Eof)?;

    line = format!("{}\n{rest}", line.trim_end_matches('\\'));
  }

  let line = line.trim_end().to_string();

  if line.is_empty() {
    Err(ReadError::Empty)
  } else {
    Ok(line)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::RecordingHost;

  #[tokio::test]
  async fn test_read_statement() {
    let host = RecordingHost::with_inputs(&["let a = \\", "  1", "   ", "a"]);

    assert_eq!(read_statement(&host).await, Ok("let a = \n  1".to_string()));
    assert_eq!(read_statement(&host).await, Err(ReadError::Empty));
    assert_eq!(read_statement(&host).await, Ok("a".to_string()));
    assert_eq!(read_statement(&host).await, Err(ReadError::Eof));
    assert_eq!(host.prompts(), vec!["> ", ". ", "> ", "> ", "> "]);
  }
}

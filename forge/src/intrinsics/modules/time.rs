use std::time::{SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::errors::RuntimeError;
use crate::intrinsics::conversions::*;
use crate::intrinsics::helpers::*;
use crate::runtime::{ExecutionContext, Module, Value};

pub fn module() -> Module {
  create_module(
    "Time",
    vec![
      create_host_intrinsic("wait", |args, _, context| Box::pin(wait(args, context))),
      create_intrinsic("now", |_| {
        let millis = SystemTime::now()
          .duration_since(UNIX_EPOCH)
          .map(|elapsed| elapsed.as_millis() as f64)
          .unwrap_or(0.0);

        Ok(Value::Number(millis))
      }),
    ],
  )
}

/// Durations are already milliseconds, so `Time.wait(1s)` and `Time.wait(1000)` agree.
async fn wait(args: Vec<Value>, context: ExecutionContext) -> Result<Value, RuntimeError> {
  let millis = expect_number(&args, 0, "Time.wait")?;

  trace!(millis, "waiting");
  context.host.sleep(millis).await;

  Ok(Value::Null)
}

#[cfg(test)]
mod tests {
  use std::rc::Rc;

  use crate::errors::ErrorCode;
  use crate::parser::parse_source;
  use crate::runtime::testing::*;
  use crate::runtime::{Interpreter, RecordingHost, RuntimeConfig};
  use crate::source::SourceCode;

  #[tokio::test]
  async fn test_wait_uses_host_sleep() {
    let host = Rc::new(RecordingHost::new());
    let interpreter = Interpreter::new(host.clone(), RuntimeConfig::default());
    let parsed = parse_source(&SourceCode::from_str("Time.wait(1.5s)\nTime.wait(20)"));

    assert!(interpreter.evaluate(&parsed.program).await.is_ok());
    assert_eq!(host.sleeps(), vec![1500.0, 20.0]);
  }

  #[tokio::test]
  async fn test_now() {
    assert_eq!(eval("Time.now() > 0").await, Ok(crate::runtime::Value::Boolean(true)));
  }

  #[tokio::test]
  async fn test_wait_needs_a_number() {
    assert_eq!(error_code("Time.wait('soon')").await, ErrorCode::Type);
  }
}

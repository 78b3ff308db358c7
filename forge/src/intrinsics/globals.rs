use std::collections::BTreeMap;

use super::conversions::*;
use super::helpers::*;
use super::IntrinsicStatement;
use crate::errors::RuntimeError;
use crate::runtime::{ExecutionContext, Value};

fn line(args: &[Value]) -> String {
  args
    .iter()
    .map(Value::to_display)
    .collect::<Vec<_>>()
    .join(" ")
}

/// A printer that puts `prefix` in front of the line, used by `console`.
fn printer(name: &'static str, prefix: &'static str) -> Value {
  Value::native(name, move |args, _, context: ExecutionContext| {
    context.host.print(&format!("{prefix}{}", line(&args)));
    ready(Ok(Value::Null))
  })
}

fn console() -> Value {
  let text = BTreeMap::from([
    ("var".to_string(), printer("console.text.var", "")),
    ("info".to_string(), printer("console.text.info", "")),
    ("warn".to_string(), printer("console.text.warn", "warning: ")),
    ("error".to_string(), printer("console.text.error", "error: ")),
  ]);

  Value::object(BTreeMap::from([
    ("log".to_string(), printer("console.log", "")),
    ("text".to_string(), Value::object(text)),
  ]))
}

pub fn globals() -> Vec<IntrinsicStatement> {
  vec![
    ("print", printer("print", "")),
    ("console", console()),
    create_host_intrinsic("inp", |args, _, context| {
      Box::pin(async move {
        let prompt = args.first().map(Value::to_display).unwrap_or_default();

        context.host.input(&prompt).await.map(Value::String)
      })
    }),
    create_host_intrinsic("random", |args, _, context| {
      ready(expect_number(&args, 0, "random").and_then(|min| {
        let max = expect_number(&args, 1, "random")?;

        Ok(Value::Number(context.host.random_int(min as i64, max as i64) as f64))
      }))
    }),
    create_intrinsic("len", len),
    create_intrinsic("str", |args| {
      Ok(Value::String(args.first().map(Value::to_display).unwrap_or_default()))
    }),
    create_intrinsic("num", |args| {
      to_number(args.first().unwrap_or(&Value::Null)).map(Value::Number)
    }),
    create_intrinsic("type", |args| {
      Ok(Value::string(args.first().unwrap_or(&Value::Null).type_name()))
    }),
  ]
}

fn len(args: &[Value]) -> Result<Value, RuntimeError> {
  let length = match args.first() {
    | Some(Value::String(text)) => text.chars().count(),
    | Some(Value::Array(items)) => items.borrow().len(),
    | Some(Value::Object(entries)) => entries.borrow().len(),
    | Some(other) => {
      return Err(RuntimeError::type_error(format!(
        "len expects a string, array or object, got {}",
        other.type_name()
      )))
    },
    | None => return Err(RuntimeError::type_error("len expects 1 argument")),
  };

  Ok(Value::Number(length as f64))
}

#[cfg(test)]
mod tests {
  use std::rc::Rc;

  use crate::errors::ErrorCode;
  use crate::parser::parse_source;
  use crate::runtime::testing::*;
  use crate::runtime::{Interpreter, RecordingHost, RuntimeConfig, Value};
  use crate::source::SourceCode;

  #[tokio::test]
  async fn test_console() {
    let output = run(indoc::indoc! {"
      console.log('a', 1)
      console.text.var('plain')
      console.text.warn('careful')
      console.text.error('broken')
    "})
    .await;

    assert_eq!(output, vec!["a 1", "plain", "warning: careful", "error: broken"]);
  }

  #[tokio::test]
  async fn test_conversions() {
    let output = run(indoc::indoc! {"
      print(len('héllo'), len([1, 2]), len({ a: 1 }))
      print(str(12) + str(true), num(' 7 ') + 1, type(null), type([]), type(print))
    "})
    .await;

    assert_eq!(output, vec!["5 2 1", "12true 8 null array function"]);
    assert_eq!(error_code("num('seven')").await, ErrorCode::Type);
    assert_eq!(error_code("len(1)").await, ErrorCode::Type);
  }

  #[tokio::test]
  async fn test_input_with_bare_prompt() {
    let host = Rc::new(RecordingHost::with_inputs(&["Ada"]));
    let interpreter = Interpreter::new(host.clone(), RuntimeConfig::default());
    let parsed = parse_source(&SourceCode::from_str(
      "let name = inp(What's your name? >> )\nprint('hi ' + name)",
    ));

    assert!(parsed.errors.is_empty());
    assert_eq!(interpreter.evaluate(&parsed.program).await, Ok(Value::Null));
    assert_eq!(host.prompts(), vec!["What's your name? >> "]);
    assert_eq!(host.output(), vec!["hi Ada"]);
  }

  #[tokio::test]
  async fn test_random() {
    assert_eq!(eval("let r = random(3, 3)\nr").await, Ok(Value::Number(3.0)));
  }
}

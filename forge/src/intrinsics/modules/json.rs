use crate::errors::RuntimeError;
use crate::intrinsics::conversions::*;
use crate::intrinsics::helpers::*;
use crate::runtime::{Module, Value};

pub fn module() -> Module {
  create_module(
    "JSON",
    vec![
      create_intrinsic("stringify", stringify),
      create_intrinsic("parse", parse),
    ],
  )
}

/// `JSON.stringify(value)`; a second truthy argument pretty-prints.
fn stringify(args: &[Value]) -> Result<Value, RuntimeError> {
  let value = args.first().cloned().unwrap_or(Value::Null);
  let json = to_json(&value)?;

  let pretty = args
    .get(1)
    .map(|flag| crate::runtime::cast_to_boolean(flag, None))
    .unwrap_or(false);

  let text = if pretty {
    serde_json::to_string_pretty(&json)
  } else {
    serde_json::to_string(&json)
  };

  text
    .map(Value::String)
    .map_err(|error| RuntimeError::type_error(error.to_string()))
}

fn parse(args: &[Value]) -> Result<Value, RuntimeError> {
  let text = expect_string(args, 0, "JSON.parse")?;

  serde_json::from_str(&text)
    .map(from_json)
    .map_err(|error| RuntimeError::type_error(format!("invalid JSON: {error}")))
}

#[cfg(test)]
mod tests {
  use crate::errors::ErrorCode;
  use crate::runtime::testing::*;

  #[tokio::test]
  async fn test_json() {
    let output = run(indoc::indoc! {r#"
      let data = JSON.parse('\{"name": "forge", "tags": [1, 2]\}')
      print(data.name, data.tags.length)
      print(JSON.stringify({ b: true, a: [1, null] }))
    "#})
    .await;

    assert_eq!(output, vec!["forge 2", r#"{"a":[1,null],"b":true}"#]);
  }

  #[tokio::test]
  async fn test_invalid_json() {
    assert_eq!(error_code(r"JSON.parse('\{')").await, ErrorCode::Type);
    assert_eq!(error_code("JSON.stringify(print)").await, ErrorCode::Type);
  }
}

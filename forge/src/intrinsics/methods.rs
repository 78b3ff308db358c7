use std::rc::Rc;

use super::conversions::*;
use super::helpers::ready;
use crate::errors::RuntimeError;
use crate::runtime::{deep_equal, Array, Value};

/// Properties and bound methods of arrays.
pub fn array_member(items: &Array, name: &str) -> Result<Value, RuntimeError> {
  let items = Rc::clone(items);

  let method = match name {
    | "length" => return Ok(Value::Number(items.borrow().len() as f64)),
    | "push" => Value::native("push", move |args, _, _| {
      let mut items = items.borrow_mut();
      items.extend(args);

      ready(Ok(Value::Number(items.len() as f64)))
    }),
    | "pop" => Value::native("pop", move |_, _, _| {
      ready(Ok(items.borrow_mut().pop().unwrap_or(Value::Null)))
    }),
    | "join" => Value::native("join", move |args, _, _| {
      let separator = match args.first() {
        | Some(separator) => separator.to_display(),
        | None => ",".to_string(),
      };

      let joined = items
        .borrow()
        .iter()
        .map(Value::to_display)
        .collect::<Vec<_>>()
        .join(&separator);

      ready(Ok(Value::String(joined)))
    }),
    | "includes" => Value::native("includes", move |args, _, _| {
      let needle = args.first().cloned().unwrap_or(Value::Null);
      let found = items.borrow().iter().any(|item| deep_equal(item, &needle));

      ready(Ok(Value::Boolean(found)))
    }),
    | _ => return Err(RuntimeError::type_error(format!("array has no property '{name}'"))),
  };

  Ok(method)
}

/// Properties and bound methods of strings.
pub fn string_member(text: &str, name: &str) -> Result<Value, RuntimeError> {
  let text = text.to_string();

  let method = match name {
    | "length" => return Ok(Value::Number(text.chars().count() as f64)),
    | "upper" => Value::native("upper", move |_, _, _| ready(Ok(Value::String(text.to_uppercase())))),
    | "lower" => Value::native("lower", move |_, _, _| ready(Ok(Value::String(text.to_lowercase())))),
    | "trim" => Value::native("trim", move |_, _, _| ready(Ok(Value::string(text.trim())))),
    // Without a separator, or with an empty one, the string splits into characters.
    | "split" => Value::native("split", move |args, _, _| {
      let parts = match args.first().map(Value::to_display) {
        | Some(separator) if !separator.is_empty() => {
          text.split(separator.as_str()).map(Value::string).collect()
        },
        | _ => text.chars().map(|ch| Value::String(ch.to_string())).collect(),
      };

      ready(Ok(Value::array(parts)))
    }),
    | "includes" => Value::native("includes", move |args, _, _| {
      ready(expect_string(&args, 0, "includes").map(|needle| Value::Boolean(text.contains(&needle))))
    }),
    | _ => return Err(RuntimeError::type_error(format!("string has no property '{name}'"))),
  };

  Ok(method)
}

#[cfg(test)]
mod tests {
  use crate::runtime::testing::*;

  #[tokio::test]
  async fn test_array_methods() {
    let output = run(indoc::indoc! {"
      let items = [1, 2]
      print(items.push(3, 4), items.pop(), items.join(), items.join(' - '))
      print(items.includes(2), items.includes('2'), [[1]].includes([1]))
    "})
    .await;

    assert_eq!(output, vec!["4 4 1,2,3 1 - 2 - 3", "true false true"]);
  }

  #[tokio::test]
  async fn test_string_methods() {
    let output = run(indoc::indoc! {"
      let text = '  Forge Lang  '
      print(text.trim().upper(), text.trim().lower(), text.length)
      print('a,b'.split(','), 'ab'.split(), 'forge'.includes('or'))
    "})
    .await;

    assert_eq!(output, vec!["FORGE LANG forge lang 14", "[\"a\", \"b\"] [\"a\", \"b\"] true"]);
  }

  #[tokio::test]
  async fn test_unknown_member() {
    assert_eq!(error_code("[].size").await, crate::errors::ErrorCode::Type);
  }
}

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Number, Value as Json};

use crate::errors::RuntimeError;
use crate::runtime::Value;

fn argument<'a>(args: &'a [Value], index: usize, function: &str) -> Result<&'a Value, RuntimeError> {
  args.get(index).ok_or_else(|| {
    RuntimeError::type_error(format!(
      "{function} expects at least {} argument(s), got {}",
      index + 1,
      args.len()
    ))
  })
}

pub fn expect_number(args: &[Value], index: usize, function: &str) -> Result<f64, RuntimeError> {
  match argument(args, index, function)? {
    | Value::Number(value) => Ok(*value),
    | other => Err(RuntimeError::type_error(format!(
      "{function} expects a number, got {}",
      other.type_name()
    ))),
  }
}

pub fn expect_string(args: &[Value], index: usize, function: &str) -> Result<String, RuntimeError> {
  match argument(args, index, function)? {
    | Value::String(value) => Ok(value.clone()),
    | other => Err(RuntimeError::type_error(format!(
      "{function} expects a string, got {}",
      other.type_name()
    ))),
  }
}

/// Numbers a variadic function works on: either every argument, or the items of a single array.
pub fn numbers(args: &[Value], function: &str) -> Result<Vec<f64>, RuntimeError> {
  let items = match args {
    | [Value::Array(items)] => items.borrow().clone(),
    | args => args.to_vec(),
  };

  (0..items.len())
    .map(|index| expect_number(&items, index, function))
    .collect()
}

/// Loose number conversion used by `num`.
pub fn to_number(value: &Value) -> Result<f64, RuntimeError> {
  match value {
    | Value::Number(value) => Ok(*value),
    | Value::Boolean(value) => Ok(if *value { 1.0 } else { 0.0 }),
    | Value::Null => Ok(0.0),
    | Value::String(text) => text.trim().parse::<f64>().map_err(|_| {
      RuntimeError::type_error(format!("cannot convert {text:?} to a number"))
    }),
    | other => Err(RuntimeError::type_error(format!(
      "cannot convert {} to a number",
      other.type_name()
    ))),
  }
}

pub fn to_json(value: &Value) -> Result<Json, RuntimeError> {
  json_in(value, &mut Vec::new())
}

fn json_in(value: &Value, open: &mut Vec<*const ()>) -> Result<Json, RuntimeError> {
  let json = match value {
    | Value::Null => Json::Null,
    | Value::Boolean(value) => Json::Bool(*value),
    | Value::Number(value) if value.fract() == 0.0 && value.abs() < 9e15 => Json::from(*value as i64),
    | Value::Number(value) => Number::from_f64(*value).map(Json::Number).unwrap_or(Json::Null),
    | Value::String(value) => Json::String(value.clone()),
    | Value::Array(items) => {
      enter(open, Rc::as_ptr(items) as *const ())?;

      let items = items
        .borrow()
        .iter()
        .map(|item| json_in(item, open))
        .collect::<Result<_, _>>()?;

      open.pop();
      Json::Array(items)
    },
    | Value::Object(entries) => {
      enter(open, Rc::as_ptr(entries) as *const ())?;

      let mut map = Map::new();

      for (key, value) in entries.borrow().iter() {
        map.insert(key.clone(), json_in(value, open)?);
      }

      open.pop();
      Json::Object(map)
    },
    | other => {
      return Err(RuntimeError::type_error(format!(
        "cannot convert {} to JSON",
        other.type_name()
      )))
    },
  };

  Ok(json)
}

fn enter(open: &mut Vec<*const ()>, pointer: *const ()) -> Result<(), RuntimeError> {
  if open.contains(&pointer) {
    return Err(RuntimeError::type_error("cannot convert a self-referencing value to JSON"));
  }

  open.push(pointer);
  Ok(())
}

pub fn from_json(json: Json) -> Value {
  match json {
    | Json::Null => Value::Null,
    | Json::Bool(value) => Value::Boolean(value),
    | Json::Number(number) => Value::Number(number.as_f64().unwrap_or(f64::NAN)),
    | Json::String(value) => Value::String(value),
    | Json::Array(items) => Value::array(items.into_iter().map(from_json).collect()),
    | Json::Object(map) => Value::object(
      map
        .into_iter()
        .map(|(key, value)| (key, from_json(value)))
        .collect::<BTreeMap<_, _>>(),
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_to_number() {
    assert_eq!(to_number(&Value::string(" 4.5 ")), Ok(4.5));
    assert_eq!(to_number(&Value::Boolean(true)), Ok(1.0));
    assert!(to_number(&Value::string("four")).is_err());
    assert!(to_number(&Value::array(vec![])).is_err());
  }

  #[test]
  fn test_numbers() {
    let spread = [Value::Number(1.0), Value::Number(2.0)];
    let packed = [Value::array(spread.to_vec())];

    assert_eq!(numbers(&spread, "max"), Ok(vec![1.0, 2.0]));
    assert_eq!(numbers(&packed, "max"), Ok(vec![1.0, 2.0]));
    assert!(numbers(&[Value::Null], "max").is_err());
  }

  #[test]
  fn test_json() {
    let value = from_json(serde_json::json!({ "a": [1, 2.5, null], "b": "x" }));

    assert_eq!(value.to_display(), "{ a: [1, 2.5, null], b: \"x\" }");
    assert_eq!(to_json(&value).map(|json| json.to_string()), Ok("{\"a\":[1,2.5,null],\"b\":\"x\"}".to_string()));
  }

  #[test]
  fn test_json_rejects_cycles() {
    let array = Value::array(vec![Value::Number(1.0)]);

    if let Value::Array(items) = &array {
      items.borrow_mut().push(array.clone());
    }

    assert!(to_json(&array).is_err());
  }
}

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use super::environment::Scope;
use super::function_id::{function_id, FunctionId};
use super::ExecutionContext;
use crate::ast::FunctionDef;
use crate::errors::RuntimeError;

pub type Array = Rc<RefCell<Vec<Value>>>;
pub type Object = Rc<RefCell<BTreeMap<String, Value>>>;
pub type NamedArgs = BTreeMap<String, Value>;

pub type NativeResult = LocalBoxFuture<'static, Result<Value, RuntimeError>>;

/// The single shape every built-in has: positional arguments, named arguments and the context of
/// the call.
pub type NativeFn = Rc<dyn Fn(Vec<Value>, NamedArgs, ExecutionContext) -> NativeResult>;

/// Runtime value. Arrays and objects are shared by every holder and mutated in place.
#[derive(Clone)]
pub enum Value {
  Null,
  Boolean(bool),
  Number(f64),
  String(String),
  Array(Array),
  Object(Object),
  Function(Function),
  Module(Rc<Module>),
}

#[derive(Clone)]
pub enum Function {
  Closure(Rc<Closure>),
  Native(Rc<NativeFunction>),
}

/// User function together with the scope it was defined in.
pub struct Closure {
  pub id: FunctionId,
  pub def: Rc<FunctionDef>,
  pub scope: Rc<Scope>,
}

pub struct NativeFunction {
  pub id: FunctionId,
  pub name: String,
  pub func: NativeFn,
}

/// Namespace of a capability module, e.g. `Math`.
pub struct Module {
  pub name: String,
  pub members: BTreeMap<String, Value>,
}

impl Value {
  pub fn string(value: impl Into<String>) -> Self {
    Value::String(value.into())
  }

  pub fn array(items: Vec<Value>) -> Self {
    Value::Array(Rc::new(RefCell::new(items)))
  }

  pub fn object(entries: BTreeMap<String, Value>) -> Self {
    Value::Object(Rc::new(RefCell::new(entries)))
  }

  pub fn native<F>(name: &str, func: F) -> Self
  where
    F: Fn(Vec<Value>, NamedArgs, ExecutionContext) -> NativeResult + 'static,
  {
    Value::Function(Function::Native(Rc::new(NativeFunction {
      id: function_id(),
      name: name.to_string(),
      func: Rc::new(func),
    })))
  }

  pub fn closure(def: Rc<FunctionDef>, scope: Rc<Scope>) -> Self {
    Value::Function(Function::Closure(Rc::new(Closure {
      id: function_id(),
      def,
      scope,
    })))
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      | Value::Null => "null",
      | Value::Boolean(_) => "boolean",
      | Value::Number(_) => "number",
      | Value::String(_) => "string",
      | Value::Array(_) => "array",
      | Value::Object(_) => "object",
      | Value::Function(_) => "function",
      | Value::Module(_) => "module",
    }
  }

  /// Text used by `print`, templates and string concatenation.
  pub fn to_display(&self) -> String {
    match self {
      | Value::String(value) => value.clone(),
      | other => other.to_repr(),
    }
  }

  /// Like [Value::to_display], but strings are quoted. Used inside collections.
  pub fn to_repr(&self) -> String {
    self.repr_in(&mut Vec::new())
  }

  /// `open` holds the collections currently being rendered, so a collection that contains itself
  /// prints as `[...]` or `{...}` instead of recursing forever.
  fn repr_in(&self, open: &mut Vec<*const ()>) -> String {
    match self {
      | Value::Null => "null".to_string(),
      | Value::Boolean(value) => value.to_string(),
      | Value::Number(value) => format_number(*value),
      | Value::String(value) => format!("{value:?}"),
      | Value::Array(items) => {
        let pointer = Rc::as_ptr(items) as *const ();

        if open.contains(&pointer) {
          return "[...]".to_string();
        }

        open.push(pointer);

        let items = items
          .borrow()
          .iter()
          .map(|item| item.repr_in(open))
          .collect::<Vec<_>>()
          .join(", ");

        open.pop();

        format!("[{items}]")
      },
      | Value::Object(entries) => {
        let pointer = Rc::as_ptr(entries) as *const ();

        if open.contains(&pointer) {
          return "{...}".to_string();
        }

        open.push(pointer);

        let entries = entries
          .borrow()
          .iter()
          .map(|(key, value)| format!("{key}: {}", value.repr_in(open)))
          .collect::<Vec<_>>()
          .join(", ");

        open.pop();

        if entries.is_empty() {
          "{}".to_string()
        } else {
          format!("{{ {entries} }}")
        }
      },
      | Value::Function(function) => format!("<func {}>", function.name()),
      | Value::Module(module) => format!("<module {}>", module.name),
    }
  }
}

impl Function {
  pub fn id(&self) -> FunctionId {
    match self {
      | Function::Closure(closure) => closure.id,
      | Function::Native(native) => native.id,
    }
  }

  pub fn name(&self) -> String {
    match self {
      | Function::Closure(closure) => closure
        .def
        .name
        .clone()
        .unwrap_or_else(|| "anonymous".to_string()),
      | Function::Native(native) => native.name.clone(),
    }
  }
}

/// Integers print without a fractional part.
pub fn format_number(value: f64) -> String {
  if value.is_nan() {
    "NaN".to_string()
  } else if value.is_infinite() {
    if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
  } else if value.fract() == 0.0 && value.abs() < 1e15 {
    format!("{}", value as i64)
  } else {
    format!("{value}")
  }
}

/// `==` and `===`: primitives by value, arrays and objects structurally, functions by identity.
pub fn deep_equal(left: &Value, right: &Value) -> bool {
  equal_in(left, right, &mut Vec::new())
}

/// Pairs of collections already under comparison count as equal, which terminates self-referencing
/// arrays and objects.
fn equal_in(left: &Value, right: &Value, seen: &mut Vec<(*const (), *const ())>) -> bool {
  match (left, right) {
    | (Value::Null, Value::Null) => true,
    | (Value::Boolean(left), Value::Boolean(right)) => left == right,
    | (Value::Number(left), Value::Number(right)) => left == right,
    | (Value::String(left), Value::String(right)) => left == right,
    | (Value::Array(left), Value::Array(right)) => {
      let pair = (Rc::as_ptr(left) as *const (), Rc::as_ptr(right) as *const ());

      if Rc::ptr_eq(left, right) || seen.contains(&pair) {
        return true;
      }

      seen.push(pair);

      let (left, right) = (left.borrow(), right.borrow());

      left.len() == right.len()
        && left
          .iter()
          .zip(right.iter())
          .all(|(left, right)| equal_in(left, right, seen))
    },
    | (Value::Object(left), Value::Object(right)) => {
      let pair = (Rc::as_ptr(left) as *const (), Rc::as_ptr(right) as *const ());

      if Rc::ptr_eq(left, right) || seen.contains(&pair) {
        return true;
      }

      seen.push(pair);

      let (left, right) = (left.borrow(), right.borrow());

      left.len() == right.len()
        && left.iter().all(|(key, value)| {
          right
            .get(key)
            .map(|other| equal_in(value, other, seen))
            .unwrap_or(false)
        })
    },
    | (Value::Function(left), Value::Function(right)) => left.id() == right.id(),
    | (Value::Module(left), Value::Module(right)) => Rc::ptr_eq(left, right),
    | _ => false,
  }
}

/// Only real booleans and the strings `"true"`/`"false"` (any case, surrounding spaces ignored).
pub fn is_boolean_like(value: &Value) -> bool {
  match value {
    | Value::Boolean(_) => true,
    | Value::String(text) => parse_boolean(text).is_some(),
    | _ => false,
  }
}

fn parse_boolean(text: &str) -> Option<bool> {
  match text.trim().to_lowercase().as_str() {
    | "true" => Some(true),
    | "false" => Some(false),
    | _ => None,
  }
}

/// Truthiness. A forced value always wins.
pub fn cast_to_boolean(value: &Value, force: Option<bool>) -> bool {
  if let Some(forced) = force {
    return forced;
  }

  match value {
    | Value::Boolean(value) => *value,
    | Value::String(text) => parse_boolean(text).unwrap_or(!text.is_empty()),
    | Value::Null => false,
    | Value::Number(value) => !value.is_nan() && *value != 0.0,
    | Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Module(_) => true,
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    deep_equal(self, other)
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_repr())
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_display())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn numbers(items: &[f64]) -> Value {
    Value::array(items.iter().map(|value| Value::Number(*value)).collect())
  }

  #[test]
  fn test_deep_equal() {
    let left = Value::object(BTreeMap::from([
      ("a".to_string(), Value::Number(1.0)),
      ("b".to_string(), numbers(&[1.0, 2.0])),
    ]));

    let right = Value::object(BTreeMap::from([
      ("b".to_string(), numbers(&[1.0, 2.0])),
      ("a".to_string(), Value::Number(1.0)),
    ]));

    assert!(deep_equal(&left, &right));
    assert!(!deep_equal(&numbers(&[1.0, 2.0, 3.0]), &numbers(&[1.0, 2.0])));
    assert!(!deep_equal(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
    assert!(!deep_equal(&Value::string("1"), &Value::Number(1.0)));
  }

  #[test]
  fn test_boolean_coercion() {
    assert!(cast_to_boolean(&Value::string(" TRUE "), None));
    assert!(!cast_to_boolean(&Value::string("false"), None));
    assert!(cast_to_boolean(&Value::string("no"), None));
    assert!(!cast_to_boolean(&Value::string(""), None));
    assert!(!cast_to_boolean(&Value::Number(f64::NAN), None));
    assert!(!cast_to_boolean(&Value::Null, None));
    assert!(cast_to_boolean(&numbers(&[]), None));
    assert!(cast_to_boolean(&Value::Null, Some(true)));
    assert!(!cast_to_boolean(&Value::Boolean(true), Some(false)));
  }

  #[test]
  fn test_is_boolean_like() {
    assert!(is_boolean_like(&Value::Boolean(false)));
    assert!(is_boolean_like(&Value::string("False ")));
    assert!(!is_boolean_like(&Value::string("yes")));
    assert!(!is_boolean_like(&Value::Number(1.0)));
  }

  #[test]
  fn test_display() {
    assert_eq!(Value::Number(5.0).to_display(), "5");
    assert_eq!(Value::Number(2.5).to_display(), "2.5");
    assert_eq!(Value::string("hi").to_display(), "hi");
    assert_eq!(
      Value::array(vec![Value::string("a"), Value::Null]).to_display(),
      "[\"a\", null]"
    );
    assert_eq!(
      Value::object(BTreeMap::from([("k".to_string(), Value::Boolean(true))])).to_display(),
      "{ k: true }"
    );
  }

  #[test]
  fn test_self_referencing_collections() {
    let array = numbers(&[1.0]);

    if let Value::Array(items) = &array {
      items.borrow_mut().push(array.clone());
    }

    let object = Value::object(BTreeMap::new());

    if let Value::Object(entries) = &object {
      entries.borrow_mut().insert("me".to_string(), object.clone());
    }

    let twin = numbers(&[1.0]);

    if let Value::Array(items) = &twin {
      items.borrow_mut().push(twin.clone());
    }

    assert_eq!(array.to_display(), "[1, [...]]");
    assert_eq!(object.to_display(), "{ me: {...} }");
    assert!(deep_equal(&array, &twin));
    assert!(!deep_equal(&array, &numbers(&[1.0, 2.0])));
  }
}

use std::collections::BTreeMap;
use std::rc::Rc;

use super::IntrinsicStatement;
use crate::errors::RuntimeError;
use crate::runtime::{ExecutionContext, Function, Module, NamedArgs, NativeResult, Value};

/// Pure intrinsic that only looks at its positional arguments.
pub type IntrinsicFn = fn(&[Value]) -> Result<Value, RuntimeError>;

/// Builds a named intrinsic out of a pure function.
pub fn create_intrinsic(name: &'static str, intrinsic: IntrinsicFn) -> IntrinsicStatement {
  let function = Value::native(name, move |args, _, _| {
    Box::pin(async move { intrinsic(&args) })
  });

  (name, function)
}

/// Builds a named intrinsic that needs named arguments or the host.
pub fn create_host_intrinsic<F>(name: &'static str, intrinsic: F) -> IntrinsicStatement
where
  F: Fn(Vec<Value>, NamedArgs, ExecutionContext) -> NativeResult + 'static,
{
  (name, Value::native(name, intrinsic))
}

/// Creates a capability module. Every function member checks that the module is enabled before
/// doing anything else.
pub fn create_module(name: &'static str, intrinsics: Vec<IntrinsicStatement>) -> Module {
  let members = intrinsics
    .into_iter()
    .map(|(member, value)| (member.to_string(), gate(name, member, value)))
    .collect::<BTreeMap<_, _>>();

  Module {
    name: name.to_string(),
    members,
  }
}

fn gate(module: &'static str, member: &str, value: Value) -> Value {
  let inner = match &value {
    | Value::Function(Function::Native(native)) => Rc::clone(&native.func),
    | _ => return value,
  };

  Value::native(&format!("{module}.{member}"), move |args, named, context| {
    let inner = Rc::clone(&inner);

    Box::pin(async move {
      context.assert_enabled(module)?;
      inner(args, named, context).await
    })
  })
}

/// A ready value as a native result.
pub fn ready(result: Result<Value, RuntimeError>) -> NativeResult {
  Box::pin(async move { result })
}

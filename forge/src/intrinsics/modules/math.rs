use std::f64::consts;

use crate::errors::RuntimeError;
use crate::intrinsics::conversions::*;
use crate::intrinsics::helpers::*;
use crate::runtime::{Module, Value};

pub fn module() -> Module {
  create_module(
    "Math",
    vec![
      ("PI", Value::Number(consts::PI)),
      create_intrinsic("abs", abs),
      create_intrinsic("floor", floor),
      create_intrinsic("ceil", ceil),
      create_intrinsic("round", round),
      create_intrinsic("sqrt", sqrt),
      create_intrinsic("pow", pow),
      create_intrinsic("min", min),
      create_intrinsic("max", max),
      // `random()` is a fraction in `[0, 1)`, `random(min, max)` an integer in `min..=max`.
      create_host_intrinsic("random", |args, _, context| {
        ready(match args.as_slice() {
          | [] => {
            let scale = 1_000_000;
            Ok(Value::Number(context.host.random_int(0, scale - 1) as f64 / scale as f64))
          },
          | args => expect_number(args, 0, "Math.random").and_then(|min| {
            let max = expect_number(args, 1, "Math.random")?;
            Ok(Value::Number(context.host.random_int(min as i64, max as i64) as f64))
          }),
        })
      }),
    ],
  )
}

fn unary(args: &[Value], name: &str, op: fn(f64) -> f64) -> Result<Value, RuntimeError> {
  expect_number(args, 0, name).map(|value| Value::Number(op(value)))
}

fn abs(args: &[Value]) -> Result<Value, RuntimeError> {
  unary(args, "Math.abs", f64::abs)
}

fn floor(args: &[Value]) -> Result<Value, RuntimeError> {
  unary(args, "Math.floor", f64::floor)
}

fn ceil(args: &[Value]) -> Result<Value, RuntimeError> {
  unary(args, "Math.ceil", f64::ceil)
}

fn round(args: &[Value]) -> Result<Value, RuntimeError> {
  unary(args, "Math.round", f64::round)
}

fn sqrt(args: &[Value]) -> Result<Value, RuntimeError> {
  unary(args, "Math.sqrt", f64::sqrt)
}

fn pow(args: &[Value]) -> Result<Value, RuntimeError> {
  let base = expect_number(args, 0, "Math.pow")?;
  let exponent = expect_number(args, 1, "Math.pow")?;

  Ok(Value::Number(base.powf(exponent)))
}

fn min(args: &[Value]) -> Result<Value, RuntimeError> {
  let numbers = numbers(args, "Math.min")?;

  Ok(Value::Number(numbers.into_iter().fold(f64::INFINITY, f64::min)))
}

fn max(args: &[Value]) -> Result<Value, RuntimeError> {
  let numbers = numbers(args, "Math.max")?;

  Ok(Value::Number(numbers.into_iter().fold(f64::NEG_INFINITY, f64::max)))
}

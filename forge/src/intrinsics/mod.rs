use crate::runtime::{Module, Value};

pub use methods::{array_member, string_member};

pub(crate) mod conversions;
pub(crate) mod helpers;
mod globals;
mod methods;
pub(crate) mod modules;

pub type IntrinsicStatement = (&'static str, Value);

/// Names every program can use without declaring them.
pub const GLOBALS: [&str; 8] = ["print", "inp", "console", "random", "len", "str", "num", "type"];

pub fn is_global(name: &str) -> bool {
  GLOBALS.contains(&name)
}

pub fn globals() -> Vec<IntrinsicStatement> {
  globals::globals()
}

/// Capability modules shipped with the language.
pub fn modules() -> Vec<Module> {
  vec![
    modules::math::module(),
    modules::time::module(),
    modules::json::module(),
  ]
}

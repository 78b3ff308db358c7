pub use context::*;
pub use environment::{Scope, ScopeKind};
pub use host::*;
pub use interpreter::*;
pub use runtime::*;
pub use value::*;

mod context;
mod environment;
mod function_id;
mod host;
mod interpreter;
mod runtime;
mod value;

#[cfg(test)]
pub mod testing;

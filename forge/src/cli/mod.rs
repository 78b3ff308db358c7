pub use read::*;
pub use repl::*;

mod read;
mod repl;

use crate::runtime::RuntimeConfig;

/// Stack of the thread the CLI evaluates on. Deeply nested programs recurse through boxed futures.
pub const STACK_SIZE: usize = 64 * 1024 * 1024;

/// What to do with a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
  Run,
  /// Report diagnostics without running.
  Check,
  Tokens,
  Ast,
}

/// Limits for evaluation on a [STACK_SIZE] thread. The stack budget keeps a few MiB spare for
/// the host and built-ins.
pub fn runtime_config() -> RuntimeConfig {
  RuntimeConfig {
    max_call_depth: 10_000,
    max_stack_bytes: STACK_SIZE - 4 * 1024 * 1024,
    ..RuntimeConfig::default()
  }
}

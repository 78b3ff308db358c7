use std::cell::RefCell;
use std::rc::Rc;

use super::HostServices;
use crate::errors::RuntimeError;
use crate::modules::ModuleContext;
use crate::source::Range;

/// Handed to every built-in call.
#[derive(Clone)]
pub struct ExecutionContext {
  pub host: Rc<dyn HostServices>,
  pub modules: Rc<RefCell<ModuleContext>>,
  /// Range of the call being dispatched.
  pub range: Option<Range>,
}

impl ExecutionContext {
  /// Fails with `E_MODULE` unless the capability module may be used.
  pub fn assert_enabled(&self, module: &str) -> Result<(), RuntimeError> {
    if self.modules.borrow().is_enabled(module) {
      Ok(())
    } else {
      Err(RuntimeError::module(format!(
        "module '{module}' is disabled, enable it with able '{module}'"
      )))
    }
  }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Assigning to an undeclared `l.x`/`v.x`/`c.x` creates it instead of failing.
  pub auto_declare_qualified_writes: bool,
  /// Maximum depth of nested user function calls.
  pub max_call_depth: usize,
  /// Stack the nested user calls of one evaluation may take. The default fits the 2 MiB threads
  /// Rust spawns; hosts that run on a bigger stack can raise it.
  pub max_stack_bytes: usize,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    RuntimeConfig {
      auto_declare_qualified_writes: false,
      max_call_depth: 256,
      max_stack_bytes: 1536 * 1024,
    }
  }
}

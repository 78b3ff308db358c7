//! Capability module gating shared by the analyzer and the runtime.

use std::collections::BTreeSet;

use crate::ast::Statement;

/// Switch that enables every capability module at once.
pub const ALL_IN_ONE: &str = "AllInOne";

/// Capability modules a program may reference.
pub const CAPABILITY_MODULES: [&str; 11] = [
  "Math", "Time", "Sys", "File", "Net", "Crypto", "Terminal", "DateTime", "Regex", "JSON", "Async",
];

pub fn is_capability_module(name: &str) -> bool {
  CAPABILITY_MODULES.contains(&name)
}

/// Which capability modules are reachable. Everything is enabled until `disable 'AllInOne'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleContext {
  all_in_one: bool,
  enabled: BTreeSet<String>,
}

impl ModuleContext {
  pub fn new() -> Self {
    ModuleContext {
      all_in_one: true,
      enabled: BTreeSet::new(),
    }
  }

  /// Turns off the `AllInOne` switch. Modules enabled earlier are forgotten, so `able` has to
  /// come after `disable`.
  pub fn disable_all(&mut self) {
    self.all_in_one = false;
    self.enabled.clear();
  }

  pub fn able(&mut self, name: &str) {
    if name == ALL_IN_ONE {
      self.all_in_one = true;
    } else {
      self.enabled.insert(name.to_string());
    }
  }

  pub fn is_all_in_one(&self) -> bool {
    self.all_in_one
  }

  pub fn is_enabled(&self, name: &str) -> bool {
    self.all_in_one || self.enabled.contains(name)
  }

  /// Modules named by `able` since the last `disable`.
  pub fn enabled(&self) -> impl Iterator<Item = &str> {
    self.enabled.iter().map(String::as_str)
  }

  /// Applies a `disable`/`able` statement; other statements are ignored.
  pub fn apply(&mut self, statement: &Statement) {
    match statement {
      | Statement::Disable(_, name) if name == ALL_IN_ONE => self.disable_all(),
      | Statement::Able(_, names) => names.iter().for_each(|name| self.able(name)),
      | _ => {},
    }
  }
}

impl Default for ModuleContext {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::source::Range;

  #[test]
  fn test_all_in_one_by_default() {
    let context = ModuleContext::new();

    assert!(context.is_enabled("Time"));
    assert!(context.is_enabled("Net"));
  }

  #[test]
  fn test_directive_order() {
    let range = Range::default();
    let mut context = ModuleContext::new();

    context.apply(&Statement::Disable(range, ALL_IN_ONE.to_string()));
    context.apply(&Statement::Able(range, vec!["Math".to_string()]));

    assert!(context.is_enabled("Math"));
    assert!(!context.is_enabled("Time"));
    assert_eq!(context.enabled().collect::<Vec<_>>(), vec!["Math"]);

    let mut reversed = ModuleContext::new();

    reversed.apply(&Statement::Able(range, vec!["Math".to_string()]));
    reversed.apply(&Statement::Disable(range, ALL_IN_ONE.to_string()));

    assert!(!reversed.is_enabled("Math"));
  }
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::Value;
use crate::ast::Store;
use crate::errors::RuntimeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
  /// Root scope holding built-ins and modules in the `c` store.
  Intrinsics,
  Global,
  Function,
  Block,
}

/// One link of the scope chain. Closures keep their defining chain alive through `parent`.
pub struct Scope {
  pub kind: ScopeKind,
  parent: Option<Rc<Scope>>,
  stores: RefCell<[HashMap<String, Value>; 3]>,
}

fn slot(store: Store) -> usize {
  match store {
    | Store::L => 0,
    | Store::V => 1,
    | Store::C => 2,
  }
}

impl Scope {
  pub fn root() -> Rc<Scope> {
    Rc::new(Scope {
      kind: ScopeKind::Intrinsics,
      parent: None,
      stores: RefCell::new(Default::default()),
    })
  }

  /// Pushes a new scope on top of `parent`. Dropping the returned scope pops it.
  pub fn push(parent: &Rc<Scope>, kind: ScopeKind) -> Rc<Scope> {
    Rc::new(Scope {
      kind,
      parent: Some(Rc::clone(parent)),
      stores: RefCell::new(Default::default()),
    })
  }

  pub fn parent(&self) -> Option<&Rc<Scope>> {
    self.parent.as_ref()
  }

  /// `var` bindings live in the nearest function or global scope.
  fn declaring_scope(self: &Rc<Self>, store: Store) -> Rc<Scope> {
    if store != Store::V {
      return Rc::clone(self);
    }

    let mut scope = Rc::clone(self);

    while scope.kind == ScopeKind::Block {
      match scope.parent.clone() {
        | Some(parent) => scope = parent,
        | None => break,
      }
    }

    scope
  }

  fn has_local(&self, name: &str) -> bool {
    self
      .stores
      .borrow()
      .iter()
      .any(|store| store.contains_key(name))
  }

  /// Declares a new binding. Redeclaring a name in the same scope is an error, not a shadow.
  pub fn declare(self: &Rc<Self>, store: Store, name: &str, value: Value) -> Result<(), RuntimeError> {
    let scope = self.declaring_scope(store);

    if scope.has_local(name) {
      return Err(RuntimeError::name(format!(
        "'{name}' is already declared in this scope"
      )));
    }

    scope.stores.borrow_mut()[slot(store)].insert(name.to_string(), value);

    Ok(())
  }

  /// Declares a built-in. Built-ins are constants of the root scope.
  pub fn define(&self, name: &str, value: Value) {
    self.stores.borrow_mut()[slot(Store::C)].insert(name.to_string(), value);
  }

  /// Looks a plain identifier up in every store, innermost scope first.
  pub fn lookup(&self, name: &str) -> Option<Value> {
    Store::ALL
      .iter()
      .find_map(|store| self.stores.borrow()[slot(*store)].get(name).cloned())
      .or_else(|| self.parent.as_ref().and_then(|parent| parent.lookup(name)))
  }

  /// Looks a qualified name, e.g. `c.limit`, up in a single store.
  pub fn lookup_in(&self, store: Store, name: &str) -> Option<Value> {
    self.stores.borrow()[slot(store)]
      .get(name)
      .cloned()
      .or_else(|| self.parent.as_ref().and_then(|parent| parent.lookup_in(store, name)))
  }

  /// Finds the scope and store that own `name`.
  fn owner(self: &Rc<Self>, name: &str, only: Option<Store>) -> Option<(Rc<Scope>, Store)> {
    let mut scope = Some(Rc::clone(self));

    while let Some(current) = scope {
      let found = Store::ALL
        .iter()
        .filter(|store| only.map(|only| only == **store).unwrap_or(true))
        .find(|store| current.stores.borrow()[slot(**store)].contains_key(name))
        .copied();

      if let Some(store) = found {
        return Some((current, store));
      }

      scope = current.parent.clone();
    }

    None
  }

  fn write(&self, store: Store, name: &str, value: Value) -> Result<(), RuntimeError> {
    if store == Store::C {
      return Err(RuntimeError::name(format!(
        "cannot assign to constant '{name}'"
      )));
    }

    self.stores.borrow_mut()[slot(store)].insert(name.to_string(), value);

    Ok(())
  }

  /// Assigns to an existing binding of a plain identifier.
  pub fn assign(self: &Rc<Self>, name: &str, value: Value) -> Result<(), RuntimeError> {
    match self.owner(name, None) {
      | Some((scope, store)) => scope.write(store, name, value),
      | None => Err(RuntimeError::name(format!("'{name}' is not defined"))),
    }
  }

  /// Assigns to a qualified binding. With `auto_declare` a missing name is created in its store
  /// instead of failing.
  pub fn assign_in(
    self: &Rc<Self>,
    store: Store,
    name: &str,
    value: Value,
    auto_declare: bool,
  ) -> Result<(), RuntimeError> {
    match self.owner(name, Some(store)) {
      | Some((scope, store)) => scope.write(store, name, value),
      | None if auto_declare => self.declare(store, name, value),
      | None => Err(RuntimeError::name(format!("'{store}.{name}' is not defined"))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::ErrorCode;

  fn number(value: f64) -> Value {
    Value::Number(value)
  }

  #[test]
  fn test_lookup_walks_outwards() {
    let global = Scope::push(&Scope::root(), ScopeKind::Global);
    global.declare(Store::L, "x", number(1.0)).ok();

    let block = Scope::push(&global, ScopeKind::Block);
    block.declare(Store::L, "x", number(2.0)).ok();

    assert_eq!(block.lookup("x"), Some(number(2.0)));
    assert_eq!(global.lookup("x"), Some(number(1.0)));
    assert_eq!(block.lookup_in(Store::C, "x"), None);
  }

  #[test]
  fn test_var_is_function_scoped() {
    let global = Scope::push(&Scope::root(), ScopeKind::Global);
    let function = Scope::push(&global, ScopeKind::Function);
    let block = Scope::push(&function, ScopeKind::Block);

    assert!(block.declare(Store::V, "count", number(0.0)).is_ok());
    assert_eq!(function.lookup_in(Store::V, "count"), Some(number(0.0)));
    assert_eq!(global.lookup("count"), None);
  }

  #[test]
  fn test_redeclaration() {
    let global = Scope::push(&Scope::root(), ScopeKind::Global);

    assert!(global.declare(Store::L, "x", number(1.0)).is_ok());

    let error = global.declare(Store::C, "x", number(2.0)).unwrap_err();
    assert_eq!(error.code, ErrorCode::Name);
  }

  #[test]
  fn test_assign() {
    let root = Scope::root();
    root.define("print", Value::Null);

    let global = Scope::push(&root, ScopeKind::Global);
    global.declare(Store::C, "limit", number(3.0)).ok();
    global.declare(Store::L, "x", number(1.0)).ok();

    let block = Scope::push(&global, ScopeKind::Block);

    assert!(block.assign("x", number(5.0)).is_ok());
    assert_eq!(global.lookup("x"), Some(number(5.0)));

    assert_eq!(block.assign("limit", number(4.0)).unwrap_err().code, ErrorCode::Name);
    assert_eq!(block.assign("print", number(4.0)).unwrap_err().code, ErrorCode::Name);
    assert_eq!(block.assign("missing", number(4.0)).unwrap_err().code, ErrorCode::Name);
  }

  #[test]
  fn test_assign_in() {
    let global = Scope::push(&Scope::root(), ScopeKind::Global);

    let error = global
      .assign_in(Store::L, "x", number(1.0), false)
      .unwrap_err();

    assert_eq!(error.code, ErrorCode::Name);
    assert!(global.assign_in(Store::L, "x", number(1.0), true).is_ok());
    assert_eq!(global.lookup_in(Store::L, "x"), Some(number(1.0)));
  }
}

use std::collections::HashMap;
use std::rc::Rc;

use super::ForgeType;
use crate::ast::{FunctionDef, Store};
use crate::modules::ModuleContext;
use crate::source::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
  Variable,
  Function,
  Parameter,
  LoopVariable,
  CatchBinding,
}

/// A declared name. `store` is set for `let`/`var`/`const` declarations and qualified writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
  pub name: String,
  pub kind: SymbolKind,
  pub store: Option<Store>,
  pub ty: ForgeType,
  pub range: Range,
}

impl Symbol {
  pub fn new(name: &str, kind: SymbolKind, store: Option<Store>, ty: ForgeType, range: Range) -> Self {
    Symbol {
      name: name.to_string(),
      kind,
      store,
      ty,
      range,
    }
  }

  pub fn is_const(&self) -> bool {
    self.store == Some(Store::C)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
  Global,
  Function,
  Block,
}

#[derive(Debug, Clone)]
struct Scope {
  kind: ScopeKind,
  names: HashMap<String, usize>,
  /// Function bodies analyzed when the scope closes, once every sibling declaration is known.
  deferred: Vec<Rc<FunctionDef>>,
}

impl Scope {
  fn new(kind: ScopeKind) -> Self {
    Scope {
      kind,
      names: HashMap::new(),
      deferred: vec![],
    }
  }
}

/// Lexical scopes plus the three flat `l`/`v`/`c` stores.
#[derive(Debug, Clone)]
pub struct Context {
  scopes: Vec<Scope>,
  stores: HashMap<Store, HashMap<String, usize>>,
  symbols: Vec<Symbol>,
  pub modules: ModuleContext,
  loop_depth: u32,
  function_depth: u32,
}

impl Context {
  pub fn new() -> Self {
    Context {
      scopes: vec![Scope::new(ScopeKind::Global)],
      stores: Store::ALL.iter().map(|store| (*store, HashMap::new())).collect(),
      symbols: vec![],
      modules: ModuleContext::new(),
      loop_depth: 0,
      function_depth: 0,
    }
  }

  // Symbols.

  /// Declares `symbol` in the current scope, or in the nearest function scope for `var`. Returns
  /// the index of the previous symbol of the same name in that scope on conflict.
  pub fn declare(&mut self, symbol: Symbol) -> Result<usize, usize> {
    let target = match symbol.store {
      | Some(Store::V) => self
        .scopes
        .iter()
        .rposition(|scope| scope.kind != ScopeKind::Block)
        .unwrap_or(0),
      | _ => self.scopes.len() - 1,
    };

    if let Some(existing) = self.scopes[target].names.get(&symbol.name) {
      return Err(*existing);
    }

    let index = self.push_symbol(symbol);
    let name = self.symbols[index].name.clone();

    self.scopes[target].names.insert(name, index);
    Ok(index)
  }

  /// Declares a name only in its flat store and the global scope, for writes like `l.x = 1`.
  pub fn declare_in_store(&mut self, store: Store, symbol: Symbol) -> usize {
    let name = symbol.name.clone();
    let index = self.push_symbol(Symbol {
      store: Some(store),
      ..symbol
    });

    self.scopes[0].names.entry(name).or_insert(index);
    index
  }

  fn push_symbol(&mut self, symbol: Symbol) -> usize {
    let index = self.symbols.len();

    if let Some(store) = symbol.store {
      self
        .stores
        .entry(store)
        .or_default()
        .insert(symbol.name.clone(), index);
    }

    self.symbols.push(symbol);
    index
  }

  pub fn resolve(&self, name: &str) -> Option<usize> {
    self
      .scopes
      .iter()
      .rev()
      .find_map(|scope| scope.names.get(name).copied())
  }

  pub fn resolve_in_store(&self, store: Store, name: &str) -> Option<usize> {
    self
      .stores
      .get(&store)
      .and_then(|names| names.get(name).copied())
  }

  pub fn symbol(&self, index: usize) -> &Symbol {
    &self.symbols[index]
  }

  pub fn set_type(&mut self, index: usize, ty: ForgeType) {
    if let Some(symbol) = self.symbols.get_mut(index) {
      symbol.ty = ty;
    }
  }

  pub fn into_symbols(self) -> Vec<Symbol> {
    self.symbols
  }

  // Scopes.

  pub fn enter_scope(&mut self, kind: ScopeKind) {
    self.scopes.push(Scope::new(kind));
  }

  /// The global scope is never popped.
  pub fn exit_scope(&mut self) {
    if self.scopes.len() > 1 {
      self.scopes.pop();
    }
  }

  pub fn is_global(&self) -> bool {
    self.scopes.len() == 1
  }

  pub fn defer(&mut self, function: Rc<FunctionDef>) {
    if let Some(scope) = self.scopes.last_mut() {
      scope.deferred.push(function);
    }
  }

  pub fn take_deferred(&mut self) -> Vec<Rc<FunctionDef>> {
    self
      .scopes
      .last_mut()
      .map(|scope| std::mem::take(&mut scope.deferred))
      .unwrap_or_default()
  }

  // Loops and functions.

  pub fn in_loop(&self) -> bool {
    self.loop_depth > 0
  }

  pub fn in_function(&self) -> bool {
    self.function_depth > 0
  }

  pub fn enter_loop(&mut self) {
    self.loop_depth += 1;
  }

  pub fn exit_loop(&mut self) {
    self.loop_depth = self.loop_depth.saturating_sub(1);
  }

  /// Enters a function body; returns the loop depth to restore on exit.
  pub fn enter_function(&mut self) -> u32 {
    self.function_depth += 1;
    std::mem::take(&mut self.loop_depth)
  }

  pub fn exit_function(&mut self, loop_depth: u32) {
    self.function_depth = self.function_depth.saturating_sub(1);
    self.loop_depth = loop_depth;
  }
}

impl Default for Context {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn variable(name: &str, store: Store) -> Symbol {
    Symbol::new(name, SymbolKind::Variable, Some(store), ForgeType::Number, Range::default())
  }

  #[test]
  fn test_shadowing() {
    let mut context = Context::new();
    let outer = context.declare(variable("x", Store::L)).ok();

    context.enter_scope(ScopeKind::Block);
    let inner = context.declare(variable("x", Store::L)).ok();

    assert_eq!(context.resolve("x"), inner);

    context.exit_scope();
    assert_eq!(context.resolve("x"), outer);
  }

  #[test]
  fn test_redeclaration_in_same_scope() {
    let mut context = Context::new();

    assert!(context.declare(variable("x", Store::L)).is_ok());
    assert!(context.declare(variable("x", Store::C)).is_err());
  }

  #[test]
  fn test_var_is_function_scoped() {
    let mut context = Context::new();

    context.enter_scope(ScopeKind::Function);
    context.enter_scope(ScopeKind::Block);
    context.declare(variable("x", Store::V)).ok();
    context.exit_scope();

    assert!(context.resolve("x").is_some());
  }

  #[test]
  fn test_stores_are_flat() {
    let mut context = Context::new();

    context.enter_scope(ScopeKind::Block);
    context.declare(variable("x", Store::L)).ok();
    context.exit_scope();

    assert!(context.resolve("x").is_none());
    assert!(context.resolve_in_store(Store::L, "x").is_some());
    assert!(context.resolve_in_store(Store::V, "x").is_none());
  }
}

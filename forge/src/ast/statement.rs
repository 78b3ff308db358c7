use std::fmt;
use std::rc::Rc;

use super::expression::Expression;
use crate::source::Range;

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
  pub range: Range,
  pub body: Vec<Statement>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
  VariableDeclaration(Range, DeclKind, String, Option<Expression>),
  /// Target is one of identifier, namespaced identifier, member or index chain.
  Assignment(Range, Expression, Expression),
  Expression(Range, Expression),
  FunctionDeclaration(Range, Rc<FunctionDef>),
  Return(Range, Option<Expression>),
  If(Range, IfStatement),
  While(Range, Expression, Block),
  For(Range, ForStatement),
  ForEach(Range, String, Expression, Block),
  Break(Range),
  Continue(Range),
  Try(Range, TryStatement),
  Throw(Range, Expression),
  Block(Block),
  Disable(Range, String),
  Able(Range, Vec<String>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Block {
  pub range: Range,
  pub body: Vec<Statement>,
}

impl Block {
  /// Placeholder used when a construct is missing its `{`.
  pub fn empty(range: Range) -> Self {
    Block {
      range,
      body: vec![],
    }
  }
}

#[derive(Debug, PartialEq, Clone)]
pub struct IfStatement {
  pub test: Expression,
  pub consequent: Block,
  pub elifs: Vec<ElifClause>,
  pub alternate: Option<Block>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ElifClause {
  pub range: Range,
  pub test: Expression,
  pub consequent: Block,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ForStatement {
  pub init: Option<Box<Statement>>,
  pub test: Option<Expression>,
  pub update: Option<Box<Statement>>,
  pub body: Block,
}

#[derive(Debug, PartialEq, Clone)]
pub struct TryStatement {
  pub block: Block,
  pub handler: Option<CatchClause>,
  pub finalizer: Option<Block>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CatchClause {
  pub range: Range,
  /// `error` when the clause has no explicit parameter.
  pub param: String,
  pub body: Block,
}

/// Shared by function declarations and arrow functions.
#[derive(Debug, PartialEq, Clone)]
pub struct FunctionDef {
  pub range: Range,
  pub name: Option<String>,
  pub is_async: bool,
  pub params: Vec<Param>,
  pub body: FunctionBody,
}

#[derive(Debug, PartialEq, Clone)]
pub enum FunctionBody {
  Block(Block),
  /// Arrow function with an expression body.
  Expression(Box<Expression>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Param {
  pub range: Range,
  pub name: String,
  pub default: Option<Expression>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DeclKind {
  Let,
  Var,
  Const,
}

impl DeclKind {
  pub fn store(&self) -> Store {
    match self {
      | DeclKind::Let => Store::L,
      | DeclKind::Var => Store::V,
      | DeclKind::Const => Store::C,
    }
  }
}

impl fmt::Display for DeclKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let keyword = match self {
      | DeclKind::Let => "let",
      | DeclKind::Var => "var",
      | DeclKind::Const => "const",
    };

    write!(f, "{keyword}")
  }
}

/// One of the three namespaced variable stores.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum Store {
  L,
  V,
  C,
}

impl Store {
  pub const ALL: [Store; 3] = [Store::L, Store::V, Store::C];

  pub fn from_prefix(prefix: &str) -> Option<Store> {
    match prefix {
      | "l" => Some(Store::L),
      | "v" => Some(Store::V),
      | "c" => Some(Store::C),
      | _ => None,
    }
  }
}

impl fmt::Display for Store {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let prefix = match self {
      | Store::L => "l",
      | Store::V => "v",
      | Store::C => "c",
    };

    write!(f, "{prefix}")
  }
}

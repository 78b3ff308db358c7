use std::fmt;
use std::rc::Rc;

use super::statement::{FunctionDef, Store};
use crate::lexer::Duration;
use crate::source::Range;

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
  Number(Range, f64),
  String(Range, String),
  Template(Range, Vec<TemplatePart>),
  Duration(Range, Duration),
  Boolean(Range, bool),
  Null(Range),
  Identifier(Range, String),
  /// `l.name`, `v.name` or `c.name`.
  Namespaced(Range, Store, String),
  Array(Range, Vec<Expression>),
  Object(Range, Vec<Property>),
  Member(Range, Box<Expression>, String),
  Index(Range, Box<Expression>, Box<Expression>),
  Call(Range, Box<Expression>, Vec<Argument>),
  Unary(Range, UnaryOp, Box<Expression>),
  Binary(Range, BinaryOp, Box<Expression>, Box<Expression>),
  Logical(Range, LogicalOp, Box<Expression>, Box<Expression>),
  Arrow(Range, Rc<FunctionDef>),
  BooleanOp(Range, BooleanOp),
}

#[derive(Debug, PartialEq, Clone)]
pub enum TemplatePart {
  Text(String),
  Expression(Expression),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Property {
  pub range: Range,
  pub key: String,
  pub value: Expression,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Argument {
  Positional(Expression),
  Named(Range, String, Expression),
}

impl Argument {
  pub fn value(&self) -> &Expression {
    match self {
      | Argument::Positional(value) | Argument::Named(_, _, value) => value,
    }
  }
}

/// Postfix `?isBoolean`, `!isBoolean` and `isBoolean` with an optional `.t`/`.f` suffix.
#[derive(Debug, PartialEq, Clone)]
pub struct BooleanOp {
  pub subject: Box<Expression>,
  pub kind: BooleanOpKind,
  pub negate: bool,
  pub force: Option<bool>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BooleanOpKind {
  Query,
  Cast,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum UnaryOp {
  Not,
  Negate,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BinaryOp {
  Add,
  Subtract,
  Multiply,
  Divide,
  Modulo,
  Power,
  Equal,
  StrictEqual,
  NotEqual,
  StrictNotEqual,
  Less,
  LessEqual,
  Greater,
  GreaterEqual,
}

impl BinaryOp {
  pub fn is_arithmetic(&self) -> bool {
    matches!(
      self,
      BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo
        | BinaryOp::Power
    )
  }

  pub fn is_equality(&self) -> bool {
    matches!(
      self,
      BinaryOp::Equal | BinaryOp::StrictEqual | BinaryOp::NotEqual | BinaryOp::StrictNotEqual
    )
  }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum LogicalOp {
  And,
  Or,
}

impl fmt::Display for UnaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | UnaryOp::Not => write!(f, "!"),
      | UnaryOp::Negate => write!(f, "-"),
    }
  }
}

impl fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let op = match self {
      | BinaryOp::Add => "+",
      | BinaryOp::Subtract => "-",
      | BinaryOp::Multiply => "*",
      | BinaryOp::Divide => "/",
      | BinaryOp::Modulo => "%",
      | BinaryOp::Power => "^",
      | BinaryOp::Equal => "==",
      | BinaryOp::StrictEqual => "===",
      | BinaryOp::NotEqual => "!=",
      | BinaryOp::StrictNotEqual => "!==",
      | BinaryOp::Less => "<",
      | BinaryOp::LessEqual => "<=",
      | BinaryOp::Greater => ">",
      | BinaryOp::GreaterEqual => ">=",
    };

    write!(f, "{op}")
  }
}

impl fmt::Display for LogicalOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | LogicalOp::And => write!(f, "&&"),
      | LogicalOp::Or => write!(f, "||"),
    }
  }
}

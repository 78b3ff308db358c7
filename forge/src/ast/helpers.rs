use super::expression::*;
use super::statement::*;
use crate::source::Range;

impl Expression {
  pub fn get_range(&self) -> Range {
    *match self {
      | Expression::Number(range, _) => range,
      | Expression::String(range, _) => range,
      | Expression::Template(range, _) => range,
      | Expression::Duration(range, _) => range,
      | Expression::Boolean(range, _) => range,
      | Expression::Null(range) => range,
      | Expression::Identifier(range, _) => range,
      | Expression::Namespaced(range, _, _) => range,
      | Expression::Array(range, _) => range,
      | Expression::Object(range, _) => range,
      | Expression::Member(range, _, _) => range,
      | Expression::Index(range, _, _) => range,
      | Expression::Call(range, _, _) => range,
      | Expression::Unary(range, _, _) => range,
      | Expression::Binary(range, _, _, _) => range,
      | Expression::Logical(range, _, _, _) => range,
      | Expression::Arrow(range, _) => range,
      | Expression::BooleanOp(range, _) => range,
    }
  }

  /// Whether the expression may appear on the left of `=`.
  pub fn is_assignable(&self) -> bool {
    match self {
      | Expression::Identifier(..) | Expression::Namespaced(..) => true,
      | Expression::Member(_, object, _) => object.is_assignable(),
      | Expression::Index(_, object, _) => object.is_assignable(),
      | _ => false,
    }
  }

  /// Root identifier of a member/index/call chain.
  pub fn root_identifier(&self) -> Option<&str> {
    match self {
      | Expression::Identifier(_, name) => Some(name),
      | Expression::Member(_, object, _)
      | Expression::Index(_, object, _)
      | Expression::Call(_, object, _) => object.root_identifier(),
      | _ => None,
    }
  }
}

impl Statement {
  pub fn get_range(&self) -> Range {
    *match self {
      | Statement::VariableDeclaration(range, _, _, _) => range,
      | Statement::Assignment(range, _, _) => range,
      | Statement::Expression(range, _) => range,
      | Statement::FunctionDeclaration(range, _) => range,
      | Statement::Return(range, _) => range,
      | Statement::If(range, _) => range,
      | Statement::While(range, _, _) => range,
      | Statement::For(range, _) => range,
      | Statement::ForEach(range, _, _, _) => range,
      | Statement::Break(range) => range,
      | Statement::Continue(range) => range,
      | Statement::Try(range, _) => range,
      | Statement::Throw(range, _) => range,
      | Statement::Block(block) => &block.range,
      | Statement::Disable(range, _) => range,
      | Statement::Able(range, _) => range,
    }
  }

  pub fn is_directive(&self) -> bool {
    matches!(self, Statement::Disable(..) | Statement::Able(..))
  }
}

use super::expression::*;
use super::statement::*;

#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
  Statement(&'a Statement),
  Expression(&'a Expression),
}

/// Pre-order walk over every statement and expression of the program.
pub fn traverse_program<S, F>(state: &mut S, program: &Program, traverser: &F)
where
  F: Fn(&mut S, Node<'_>),
{
  program
    .body
    .iter()
    .for_each(|statement| traverse_statement(state, statement, traverser));
}

fn traverse_block<S, F>(state: &mut S, block: &Block, traverser: &F)
where
  F: Fn(&mut S, Node<'_>),
{
  block
    .body
    .iter()
    .for_each(|statement| traverse_statement(state, statement, traverser));
}

fn traverse_function<S, F>(state: &mut S, function: &FunctionDef, traverser: &F)
where
  F: Fn(&mut S, Node<'_>),
{
  for param in &function.params {
    if let Some(default) = &param.default {
      traverse_expression(state, default, traverser);
    }
  }

  match &function.body {
    | FunctionBody::Block(block) => traverse_block(state, block, traverser),
    | FunctionBody::Expression(expression) => traverse_expression(state, expression, traverser),
  }
}

pub fn traverse_statement<S, F>(state: &mut S, root: &Statement, traverser: &F)
where
  F: Fn(&mut S, Node<'_>),
{
  traverser(state, Node::Statement(root));

  match root {
    | Statement::VariableDeclaration(_, _, _, value) | Statement::Return(_, value) => {
      if let Some(value) = value {
        traverse_expression(state, value, traverser);
      }
    },
    | Statement::Assignment(_, target, value) => {
      traverse_expression(state, target, traverser);
      traverse_expression(state, value, traverser);
    },
    | Statement::Expression(_, expression) | Statement::Throw(_, expression) => {
      traverse_expression(state, expression, traverser);
    },
    | Statement::FunctionDeclaration(_, function) => traverse_function(state, function, traverser),
    | Statement::If(_, statement) => {
      traverse_expression(state, &statement.test, traverser);
      traverse_block(state, &statement.consequent, traverser);

      for elif in &statement.elifs {
        traverse_expression(state, &elif.test, traverser);
        traverse_block(state, &elif.consequent, traverser);
      }

      if let Some(alternate) = &statement.alternate {
        traverse_block(state, alternate, traverser);
      }
    },
    | Statement::While(_, test, body) | Statement::ForEach(_, _, test, body) => {
      traverse_expression(state, test, traverser);
      traverse_block(state, body, traverser);
    },
    | Statement::For(_, statement) => {
      if let Some(init) = &statement.init {
        traverse_statement(state, init, traverser);
      }

      if let Some(test) = &statement.test {
        traverse_expression(state, test, traverser);
      }

      if let Some(update) = &statement.update {
        traverse_statement(state, update, traverser);
      }

      traverse_block(state, &statement.body, traverser);
    },
    | Statement::Try(_, statement) => {
      traverse_block(state, &statement.block, traverser);

      if let Some(handler) = &statement.handler {
        traverse_block(state, &handler.body, traverser);
      }

      if let Some(finalizer) = &statement.finalizer {
        traverse_block(state, finalizer, traverser);
      }
    },
    | Statement::Block(block) => traverse_block(state, block, traverser),
    | Statement::Break(_)
    | Statement::Continue(_)
    | Statement::Disable(..)
    | Statement::Able(..) => {},
  }
}

pub fn traverse_expression<S, F>(state: &mut S, root: &Expression, traverser: &F)
where
  F: Fn(&mut S, Node<'_>),
{
  traverser(state, Node::Expression(root));

  match root {
    | Expression::Template(_, parts) => {
      for part in parts {
        if let TemplatePart::Expression(expression) = part {
          traverse_expression(state, expression, traverser);
        }
      }
    },
    | Expression::Array(_, items) => {
      items
        .iter()
        .for_each(|item| traverse_expression(state, item, traverser));
    },
    | Expression::Object(_, properties) => {
      properties
        .iter()
        .for_each(|property| traverse_expression(state, &property.value, traverser));
    },
    | Expression::Member(_, object, _) => traverse_expression(state, object, traverser),
    | Expression::Index(_, object, index) => {
      traverse_expression(state, object, traverser);
      traverse_expression(state, index, traverser);
    },
    | Expression::Call(_, callee, arguments) => {
      traverse_expression(state, callee, traverser);

      arguments
        .iter()
        .for_each(|argument| traverse_expression(state, argument.value(), traverser));
    },
    | Expression::Unary(_, _, operand) => traverse_expression(state, operand, traverser),
    | Expression::Binary(_, _, left, right) | Expression::Logical(_, _, left, right) => {
      traverse_expression(state, left, traverser);
      traverse_expression(state, right, traverser);
    },
    | Expression::Arrow(_, function) => traverse_function(state, function, traverser),
    | Expression::BooleanOp(_, op) => traverse_expression(state, &op.subject, traverser),
    | Expression::Number(..)
    | Expression::String(..)
    | Expression::Duration(..)
    | Expression::Boolean(..)
    | Expression::Null(..)
    | Expression::Identifier(..)
    | Expression::Namespaced(..) => {},
  }
}

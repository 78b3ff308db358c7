pub use parser::*;

mod combinators;
mod expression;
mod lookahead;
mod parser;
mod statement;
mod template;

#[cfg(test)]
pub mod testing;

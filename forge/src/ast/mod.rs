pub use expression::*;
pub use statement::*;

mod expression;
mod helpers;
mod statement;
pub mod traverser;

pub use lexer::*;
pub use token::*;

mod lexer;
pub mod parser;
mod token;

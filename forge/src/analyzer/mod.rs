pub use analyzer::*;
pub use context::{Symbol, SymbolKind};
pub use types::*;

mod analyzer;
mod context;
mod types;

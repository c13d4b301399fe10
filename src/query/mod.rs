pub mod compiler;
pub mod operators;

pub use compiler::{compile, compile_with_filters, CompiledQuery, ParsedOperators};
pub use operators::{syntax_docs, Operator};

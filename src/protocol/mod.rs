//! Request pipeline: parse a request line into tokens, then analyze the
//! tokens into a typed [`Query`].

pub mod analyzer;
pub mod commands;
pub mod parser;

pub use analyzer::Analyzer;
pub use commands::{Command, Query};
pub use parser::Parser;

//! Command implementations for sse-cli

pub mod listen;
pub mod parse;

pub use listen::listen;
pub use parse::parse;

//! Incremental XML parsing for the tool's report stream.

mod error;
mod parser;
mod path;
mod scanner;

pub use error::*;
pub use parser::*;
pub use path::*;

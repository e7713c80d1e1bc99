//! Command-line construction for the analysis tool.

mod builder;
mod options;

pub use builder::*;
pub use options::*;

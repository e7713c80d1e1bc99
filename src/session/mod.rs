//! Tool process lifecycle and report pipe pumping.

mod error;
mod pipe;
mod process;
mod runner;

pub use error::*;
pub use process::*;
pub use runner::*;

//! Memcheck report model: the tree of findings and the builder that fills it.

mod builder;
mod error;
mod filter;
mod frame;
mod kind;
mod tree;

pub use builder::*;
pub use error::*;
pub use filter::*;
pub use frame::Frame;
pub use kind::*;
pub use tree::*;

//! grindview - run memcheck and turn its streamed XML report into a tree.

pub mod args;
pub mod config;
pub mod display;
pub mod report;
#[cfg(unix)]
pub mod session;
pub mod xml;

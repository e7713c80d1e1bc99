//! Streaming XML parser tests.

mod parser_test;

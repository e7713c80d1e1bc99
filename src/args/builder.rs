//! Ordered command-line argument list.

use std::fmt::Display;

/// Accumulates `--name=value` style arguments in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgsBuilder {
    args: Vec<String>,
}

impl ArgsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw argument.
    pub fn add(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Append several raw arguments.
    pub fn extend<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `--name=value`.
    pub fn add_value(&mut self, name: &str, value: impl Display) -> &mut Self {
        self.add(format!("--{name}={value}"))
    }

    /// Append `--name=yes` or `--name=no`.
    pub fn add_bool(&mut self, name: &str, value: bool) -> &mut Self {
        self.add_value(name, if value { "yes" } else { "no" })
    }

    /// Append `--name=value` only when a value is set.
    pub fn add_optional<T: Display>(&mut self, name: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.add_value(name, value);
        }
        self
    }

    /// Append `--name=0x..` only when a byte is set.
    pub fn add_byte(&mut self, name: &str, value: Option<u8>) -> &mut Self {
        self.add_optional(name, value.map(|b| format!("{b:#x}")))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn build(self) -> Vec<String> {
        self.args
    }
}

//! Report builder error types.

/// Errors that abort report building.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The report was produced by a different tool than expected.
    #[error("Report was produced by tool {found:?}, expected {expected:?}")]
    ToolMismatch { expected: String, found: String },
}

/// A numeric field did not fit its column and was clamped.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Value {text:?} of <{field}> is too big for {bits} bits, clamped to {clamped}")]
pub struct NumericRangeWarning {
    /// Element the value came from.
    pub field: &'static str,
    /// Raw element content.
    pub text: String,
    /// Value stored instead.
    pub clamped: u64,
    /// Width of the target column.
    pub bits: u32,
}

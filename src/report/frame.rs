//! Stack frame records and permissive numeric field parsing.

use super::error::NumericRangeWarning;

/// The frame currently being read from a `<frame>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub ip: u64,
    pub object: Option<String>,
    pub function: Option<String>,
    pub directory: Option<String>,
    pub file: Option<String>,
    pub line: u32,
}

impl Frame {
    /// Forget every field, ready for the next `<frame>`.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Human-readable line for the `nth` frame of a stack (1-based).
    ///
    /// The first frame reads `at`, the callers read `by`.
    #[must_use]
    pub fn display(&self, nth: u32) -> String {
        let prefix = if nth < 2 { "at" } else { "by" };
        let function = self.function.as_deref().unwrap_or("???");
        match self.file.as_deref() {
            Some(file) => format!("{prefix} {function} ({file}:{})", self.line),
            None => format!(
                "{prefix} {function} (in {})",
                self.object.as_deref().unwrap_or("???")
            ),
        }
    }
}

/// Parse an unsigned value the way `strtoull(.., 0)` would, minus octal.
///
/// Returns the value (saturated at `u64::MAX`), whether it overflowed, and
/// whether anything but digits followed.
fn parse_prefix(text: &str) -> (u64, bool, bool) {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let (digits, radix) = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (unsigned, 10),
    };

    let mut value: u64 = 0;
    let mut overflowed = false;
    let mut used = 0;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        used += c.len_utf8();
        if !overflowed {
            match value
                .checked_mul(u64::from(radix))
                .and_then(|v| v.checked_add(u64::from(digit)))
            {
                Some(v) => value = v,
                None => {
                    overflowed = true;
                    value = u64::MAX;
                }
            }
        }
    }
    (value, overflowed, used < digits.len() || digits.is_empty())
}

fn parse_clamped(
    field: &'static str,
    text: &str,
    max: u64,
    bits: u32,
) -> (u64, Option<NumericRangeWarning>) {
    let (value, overflowed, trailing) = parse_prefix(text);
    if trailing {
        tracing::warn!(field, value = %text, "Invalid data at end of numeric value");
    }
    if overflowed || value > max {
        let warning = NumericRangeWarning {
            field,
            text: text.to_string(),
            clamped: max,
            bits,
        };
        tracing::warn!(field, value = %text, clamped = max, "{warning}");
        return (max, Some(warning));
    }
    (value, None)
}

/// Parse an `<ip>` value, clamping at `u64::MAX`.
pub(crate) fn parse_ip(text: &str) -> (u64, Option<NumericRangeWarning>) {
    parse_clamped("ip", text, u64::MAX, 64)
}

/// Parse a `<line>` value, clamping at `u32::MAX`.
pub(crate) fn parse_line(text: &str) -> (u32, Option<NumericRangeWarning>) {
    let (value, warning) = parse_clamped("line", text, u64::from(u32::MAX), 32);
    (u32::try_from(value).unwrap_or(u32::MAX), warning)
}

//! Classification of reported errors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a memcheck finding, as named in the `<kind>` element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No kind seen yet, or a kind this version does not know.
    #[default]
    Unclassified,
    InvalidFree,
    MismatchedFree,
    InvalidRead,
    InvalidWrite,
    InvalidJump,
    Overlap,
    InvalidMemPool,
    UninitCondition,
    UninitValue,
    SyscallParam,
    ClientCheck,
    #[serde(rename = "Leak_DefinitelyLost")]
    LeakDefinitelyLost,
    #[serde(rename = "Leak_IndirectlyLost")]
    LeakIndirectlyLost,
    #[serde(rename = "Leak_PossiblyLost")]
    LeakPossiblyLost,
    #[serde(rename = "Leak_StillReachable")]
    LeakStillReachable,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::Unclassified,
        Self::InvalidFree,
        Self::MismatchedFree,
        Self::InvalidRead,
        Self::InvalidWrite,
        Self::InvalidJump,
        Self::Overlap,
        Self::InvalidMemPool,
        Self::UninitCondition,
        Self::UninitValue,
        Self::SyscallParam,
        Self::ClientCheck,
        Self::LeakDefinitelyLost,
        Self::LeakIndirectlyLost,
        Self::LeakPossiblyLost,
        Self::LeakStillReachable,
    ];

    /// Classify the content of a `<kind>` element.
    ///
    /// Unknown names map to [`ErrorKind::Unclassified`].
    #[must_use]
    pub fn from_tool_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.tool_name() == name)
            .unwrap_or_default()
    }

    /// The name the tool uses for this kind.
    #[must_use]
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Unclassified => "Unclassified",
            Self::InvalidFree => "InvalidFree",
            Self::MismatchedFree => "MismatchedFree",
            Self::InvalidRead => "InvalidRead",
            Self::InvalidWrite => "InvalidWrite",
            Self::InvalidJump => "InvalidJump",
            Self::Overlap => "Overlap",
            Self::InvalidMemPool => "InvalidMemPool",
            Self::UninitCondition => "UninitCondition",
            Self::UninitValue => "UninitValue",
            Self::SyscallParam => "SyscallParam",
            Self::ClientCheck => "ClientCheck",
            Self::LeakDefinitelyLost => "Leak_DefinitelyLost",
            Self::LeakIndirectlyLost => "Leak_IndirectlyLost",
            Self::LeakPossiblyLost => "Leak_PossiblyLost",
            Self::LeakStillReachable => "Leak_StillReachable",
        }
    }

    /// Returns true for the `Leak_*` kinds.
    #[must_use]
    pub fn is_leak(self) -> bool {
        matches!(
            self,
            Self::LeakDefinitelyLost
                | Self::LeakIndirectlyLost
                | Self::LeakPossiblyLost
                | Self::LeakStillReachable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

/// Error returned when parsing an unknown kind name strictly.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown error kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for ErrorKind {
    type Err = ParseKindError;

    /// Strict, case-insensitive parse used for user input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', "").to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.tool_name().replace('_', "").to_ascii_lowercase() == wanted)
            .ok_or_else(|| ParseKindError(s.to_string()))
    }
}

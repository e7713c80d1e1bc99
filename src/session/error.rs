//! Session error types.

use crate::report::ReportError;

/// Error type for spawning the tool.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The binary was not found.
    #[error("Tool binary not found")]
    NotFound,
    /// Permission denied when spawning.
    #[error("Permission denied")]
    PermissionDenied,
    /// The command line was empty.
    #[error("No program to run")]
    EmptyCommand,
    /// The report pipe could not be set up.
    #[error("Failed to create report pipe: {0}")]
    Pipe(#[source] std::io::Error),
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err),
        }
    }
}

/// Errors returned by [`Session`](super::Session).
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// A run is already in progress.
    #[error("A session is already running")]
    Busy,
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// The report was rejected and the run was stopped.
    #[error(transparent)]
    Report(#[from] ReportError),
}

//! The descriptor the tool writes its report to.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use tokio::net::unix::pipe::Receiver;

use super::error::SpawnError;

/// Read end registered with the reactor, write end for the child.
#[derive(Debug)]
pub(crate) struct ReportPipe {
    pub(crate) receiver: Receiver,
    pub(crate) writer: OwnedFd,
}

impl ReportPipe {
    /// Create the pipe.
    ///
    /// The read end is close-on-exec and non-blocking. The write end is left
    /// inheritable so the child finds it under [`ReportPipe::child_fd`].
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn new() -> Result<Self, SpawnError> {
        let (reader, writer) =
            nix::unistd::pipe().map_err(|errno| SpawnError::Pipe(errno.into()))?;
        fcntl(reader.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
            .map_err(|errno| SpawnError::Pipe(errno.into()))?;
        let receiver = Receiver::from_owned_fd(reader).map_err(SpawnError::Pipe)?;
        Ok(Self { receiver, writer })
    }

    /// Descriptor number the child writes to.
    pub(crate) fn child_fd(&self) -> RawFd {
        self.writer.as_raw_fd()
    }
}

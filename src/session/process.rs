//! Tool process spawning and termination.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::{Child, Command};

use super::error::SpawnError;

/// Length of one wait for exit after SIGTERM.
pub const TERMINATE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Waits made before escalating to SIGKILL.
pub const TERMINATE_POLL_TICKS: u32 = 10;

/// A running tool process.
#[derive(Debug)]
pub struct ToolProcess {
    child: Child,
}

impl ToolProcess {
    /// Spawn `argv[0]` with the remaining arguments.
    ///
    /// Standard streams are inherited. The child is killed if the handle is
    /// dropped while it still runs.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the command line is empty or the process
    /// fails to spawn.
    pub fn spawn(argv: &[String]) -> Result<Self, SpawnError> {
        let (program, args) = argv.split_first().ok_or(SpawnError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);

        let child = cmd.spawn().map_err(SpawnError::from_io)?;
        tracing::info!(program = %program, pid = child.id(), "Spawned tool");

        Ok(Self { child })
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Check if the process has exited without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried.
    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Stop the process and reap it.
    ///
    /// Sends SIGTERM and returns as soon as the process exits. After
    /// [`TERMINATE_POLL_TICKS`] waits of [`TERMINATE_POLL_INTERVAL`] it is
    /// killed instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried or the kill
    /// fails.
    pub async fn terminate(&mut self) -> std::io::Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        if !self.send_term() {
            // Already gone.
            return self.child.wait().await;
        }

        for tick in 1..=TERMINATE_POLL_TICKS {
            if let Ok(status) =
                tokio::time::timeout(TERMINATE_POLL_INTERVAL, self.child.wait()).await
            {
                let status = status?;
                tracing::debug!(tick, %status, "Tool exited after SIGTERM");
                return Ok(status);
            }
        }

        tracing::debug!(pid = self.id(), "Tool ignored SIGTERM, killing");
        self.child.kill().await?;
        self.child.wait().await
    }

    /// Returns false if the signal could not be delivered.
    fn send_term(&self) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.id() else {
            return false;
        };
        let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
        kill(nix_pid, Signal::SIGTERM).is_ok()
    }
}

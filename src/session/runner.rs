//! One run of the tool, from spawn to teardown.
//!
//! The session owns the child, the read end of the report pipe and the
//! parser. Bytes read from the pipe are fed to the parser as they arrive,
//! so the tree grows while the tool is still running.

use std::os::fd::RawFd;
use std::process::ExitStatus;

use tokio::net::unix::pipe::Receiver;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::args::{ArgsBuilder, ToolOptions};
use crate::config::ToolConfig;
use crate::report::{ReportBuilder, ReportError, ResultTree, TreeChange};
use crate::xml::{FeedError, StreamingXmlParser};

use super::error::SessionError;
use super::pipe::ReportPipe;
use super::process::ToolProcess;

/// Size of each read from the report pipe.
pub const READ_BUFFER_SIZE: usize = 8192;

/// Whether the pipe should still be watched after a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    KeepWatching,
    /// EOF or a read error; the pipe is done.
    StopWatching,
}

enum Step {
    Exited(std::io::Result<ExitStatus>),
    Readable(std::io::Result<()>),
}

/// Build the tool command line for a report written to `fd`.
#[must_use]
pub fn command_line<S: AsRef<str>>(
    tool: &ToolConfig,
    fd: RawFd,
    program_argv: &[S],
    options: &ToolOptions,
) -> Vec<String> {
    let mut args = ArgsBuilder::new();
    args.add(&tool.program)
        .add(&tool.report_flag)
        .add_value(&tool.fd_flag, fd)
        .add("-q")
        .add("--child-silent-after-fork=yes")
        .extend(options.to_args())
        .add("--")
        .extend(program_argv.iter().map(|arg| arg.as_ref().to_string()));
    args.build()
}

/// Runs the tool and turns its report into a [`ResultTree`].
#[derive(Debug)]
pub struct Session {
    tool: ToolConfig,
    parser: StreamingXmlParser<ReportBuilder>,
    child: Option<ToolProcess>,
    pipe: Option<Receiver>,
    exit_status: Option<ExitStatus>,
    /// Set once the end of stream has been fed for the current run.
    finalized: bool,
    fatal: Option<ReportError>,
}

impl Session {
    #[must_use]
    pub fn new(tool: ToolConfig) -> Self {
        let builder = ReportBuilder::with_schema(&tool.root_element, tool.tool_id.clone());
        Self {
            tool,
            parser: StreamingXmlParser::new(builder),
            child: None,
            pipe: None,
            exit_status: None,
            finalized: false,
            fatal: None,
        }
    }

    #[must_use]
    pub fn tool(&self) -> &ToolConfig {
        &self.tool
    }

    /// Returns true while a child or its report pipe is alive.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.child.is_some() || self.pipe.is_some()
    }

    /// Tree built by the current or last run.
    #[must_use]
    pub fn tree(&self) -> &ResultTree {
        self.parser.handler().tree()
    }

    #[must_use]
    pub fn builder(&self) -> &ReportBuilder {
        self.parser.handler()
    }

    /// Observe the tree of the current run. Call after [`Session::start`].
    pub fn subscribe(&mut self) -> UnboundedReceiver<TreeChange> {
        self.parser.handler_mut().subscribe()
    }

    /// Exit status of the last child, once reaped.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Whether the end of stream was fed for the current run.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Take the tree, leaving an empty one.
    pub fn take_tree(&mut self) -> ResultTree {
        let fresh = self.new_builder();
        std::mem::replace(self.parser.handler_mut(), fresh).into_tree()
    }

    fn new_builder(&self) -> ReportBuilder {
        ReportBuilder::with_schema(&self.tool.root_element, self.tool.tool_id.clone())
    }

    /// Spawn the tool on `program_argv`.
    ///
    /// The tree of a previous run is discarded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Busy` if a run is in progress and
    /// `SessionError::Spawn` if the pipe or the process cannot be created.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime with I/O enabled.
    pub fn start<S: AsRef<str>>(
        &mut self,
        program_argv: &[S],
        options: &ToolOptions,
    ) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }

        let pipe = ReportPipe::new()?;
        let argv = command_line(&self.tool, pipe.child_fd(), program_argv, options);
        tracing::debug!(argv = ?argv, "Starting tool");

        let child = ToolProcess::spawn(&argv)?;
        let ReportPipe { receiver, writer } = pipe;
        // The child holds its own copy; ours would keep EOF from arriving.
        drop(writer);

        let fresh = self.new_builder();
        *self.parser.handler_mut() = fresh;
        self.parser.reset();
        self.child = Some(child);
        self.pipe = Some(receiver);
        self.exit_status = None;
        self.finalized = false;
        self.fatal = None;
        Ok(())
    }

    /// Wait for the pipe to become readable, then drain it.
    ///
    /// Closes the pipe when it returns [`ReadStatus::StopWatching`].
    pub async fn pump(&mut self) -> ReadStatus {
        let Some(pipe) = self.pipe.as_ref() else {
            return ReadStatus::StopWatching;
        };
        let ready = pipe.readable().await;
        let status = match ready {
            Ok(()) => self.drain_pipe(),
            Err(err) => {
                tracing::warn!(error = %err, "Report pipe failed");
                ReadStatus::StopWatching
            }
        };
        if status == ReadStatus::StopWatching {
            self.close_pipe();
        }
        status
    }

    /// Read whatever is available without waiting and feed it.
    pub fn drain_pipe(&mut self) -> ReadStatus {
        let Self {
            pipe, parser, fatal, ..
        } = self;
        let Some(pipe) = pipe.as_ref() else {
            return ReadStatus::StopWatching;
        };

        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            match pipe.try_read(&mut buf) {
                Ok(0) => {
                    tracing::debug!("Report pipe reached EOF");
                    return ReadStatus::StopWatching;
                }
                Ok(n) => {
                    feed(parser, fatal, &buf[..n], false);
                    if n < buf.len() {
                        return ReadStatus::KeepWatching;
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    return ReadStatus::KeepWatching;
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to read report pipe");
                    return ReadStatus::StopWatching;
                }
            }
        }
    }

    /// Drive a started run until the tool has exited and its report pipe
    /// is closed, then tear down.
    ///
    /// Returns the exit status of the tool if it was reaped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Report` if the report was rejected; the tool
    /// is terminated in that case.
    pub async fn run(&mut self) -> Result<Option<ExitStatus>, SessionError> {
        while self.fatal.is_none() {
            let step = match (self.child.as_mut(), self.pipe.as_ref()) {
                (None, None) => break,
                (Some(child), Some(pipe)) => tokio::select! {
                    status = child.wait() => Step::Exited(status),
                    ready = pipe.readable() => Step::Readable(ready),
                },
                (Some(child), None) => Step::Exited(child.wait().await),
                (None, Some(pipe)) => Step::Readable(pipe.readable().await),
            };

            match step {
                Step::Exited(result) => self.reap(result),
                Step::Readable(Ok(())) => {
                    if self.drain_pipe() == ReadStatus::StopWatching {
                        self.close_pipe();
                    }
                }
                Step::Readable(Err(err)) => {
                    tracing::warn!(error = %err, "Report pipe failed");
                    self.close_pipe();
                }
            }
        }

        self.teardown().await;
        match self.fatal.take() {
            Some(err) => Err(SessionError::Report(err)),
            None => Ok(self.exit_status),
        }
    }

    /// Stop the tool and finish the report.
    ///
    /// Does nothing on an idle session.
    pub async fn terminate(&mut self) {
        if self.is_busy() {
            self.teardown().await;
        }
    }

    fn reap(&mut self, result: std::io::Result<ExitStatus>) {
        match result {
            Ok(status) => {
                tracing::debug!(%status, "Tool exited");
                self.exit_status = Some(status);
            }
            Err(err) => tracing::warn!(error = %err, "Failed to wait for tool"),
        }
        self.child = None;
    }

    fn close_pipe(&mut self) {
        if self.pipe.take().is_some() {
            tracing::debug!("Stopped watching report pipe");
        }
    }

    async fn teardown(&mut self) {
        if let Some(mut child) = self.child.take() {
            match child.terminate().await {
                Ok(status) => {
                    tracing::debug!(%status, "Tool reaped");
                    self.exit_status = Some(status);
                }
                Err(err) => tracing::warn!(error = %err, "Failed to terminate tool"),
            }
        }

        if self.pipe.is_some() {
            self.drain_pipe();
        }
        self.close_pipe();

        if !self.finalized {
            self.finalized = true;
            feed(&mut self.parser, &mut self.fatal, &[], true);
        }
    }
}

fn feed(
    parser: &mut StreamingXmlParser<ReportBuilder>,
    fatal: &mut Option<ReportError>,
    bytes: &[u8],
    is_final: bool,
) {
    match parser.feed(bytes, is_final) {
        Ok(()) => {}
        Err(FeedError::Malformed(err)) => {
            tracing::warn!(offset = err.offset, error = %err, "Malformed report");
        }
        Err(FeedError::Handler(err)) => {
            tracing::warn!(error = %err, "Report rejected");
            fatal.get_or_insert(err);
        }
    }
}

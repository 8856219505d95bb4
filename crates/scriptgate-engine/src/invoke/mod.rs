//! Process invocation layer.
//!
//! A decision process is anything that reads a request document on stdin and
//! writes a decision document on stdout. `PolicyProcess` is that capability;
//! `ScriptProcess` is the implementation that spawns a configured command.

pub mod command;
pub mod reader;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use scriptgate_core::error::Result;

pub use command::ScriptProcess;
pub use reader::{read_bounded, read_capped, BoundedOutput};

/// Outcome of one process run. Lives for a single request.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Exit code, `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Captured stdout (at most the configured ceiling).
    pub stdout: Bytes,
    /// Captured stderr (diagnostics only, never parsed).
    pub stderr: String,
    pub elapsed: Duration,
    /// More output was produced than the ceiling allows.
    pub output_truncated: bool,
    /// Stdout ceiling the run was held to.
    pub output_limit: usize,
}

impl Invocation {
    pub fn process_failed(&self) -> bool {
        !self.success
    }
}

/// External decision-maker: request bytes in, decision bytes out.
#[async_trait]
pub trait PolicyProcess: Send + Sync {
    /// Short label for logs.
    fn describe(&self) -> &str;

    /// Run once with `input` on stdin.
    ///
    /// Timeouts and spawn failures are errors. A non-zero exit or an output
    /// overflow is reported through the returned `Invocation`.
    async fn run(&self, input: Bytes) -> Result<Invocation>;
}

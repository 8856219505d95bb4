//! Shared error type across scriptgate crates.

use thiserror::Error;

/// Stable error kinds (used as log fields and metric labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request could not be represented as JSON.
    Encoding,
    /// Executable missing or not runnable.
    Spawn,
    /// Pipe or wait failure while talking to the child.
    Io,
    /// Child exceeded its time budget.
    Timeout,
    /// Child wrote more than the output ceiling.
    OutputTooLarge,
    /// Output was not a valid decision document.
    Decode,
    /// Non-zero exit without usable output.
    ProcessExit,
    /// No process slot became free in time.
    Saturated,
    /// Invalid configuration.
    Config,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Encoding => "ENCODING",
            ErrorKind::Spawn => "SPAWN",
            ErrorKind::Io => "IO",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::OutputTooLarge => "OUTPUT_TOO_LARGE",
            ErrorKind::Decode => "DECODE",
            ErrorKind::ProcessExit => "PROCESS_EXIT",
            ErrorKind::Saturated => "SATURATED",
            ErrorKind::Config => "CONFIG",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ScriptGateError>;

/// Unified error type used by core and engine.
#[derive(Debug, Error)]
pub enum ScriptGateError {
    #[error("encoding failed: {0}")]
    Encoding(String),
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("io: {0}")]
    Io(String),
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("process exited with {}: {detail}", fmt_exit_code(.code))]
    ProcessExit { code: Option<i32>, detail: String },
    #[error("no process slot available within {waited_ms}ms")]
    Saturated { waited_ms: u64 },
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ScriptGateError {
    /// Map to a stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptGateError::Encoding(_) => ErrorKind::Encoding,
            ScriptGateError::Spawn(_) => ErrorKind::Spawn,
            ScriptGateError::Io(_) => ErrorKind::Io,
            ScriptGateError::Timeout { .. } => ErrorKind::Timeout,
            ScriptGateError::OutputTooLarge { .. } => ErrorKind::OutputTooLarge,
            ScriptGateError::Decode(_) => ErrorKind::Decode,
            ScriptGateError::ProcessExit { .. } => ErrorKind::ProcessExit,
            ScriptGateError::Saturated { .. } => ErrorKind::Saturated,
            ScriptGateError::Config(_) => ErrorKind::Config,
            ScriptGateError::Internal(_) => ErrorKind::Internal,
        }
    }
}

fn fmt_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "signal".to_string(),
    }
}

//! scriptgate core: wire contracts for external policy processes and the shared
//! error surface.
//!
//! This crate defines the JSON documents exchanged with a decision process
//! (request on stdin, decision on stdout) and the error taxonomy used by the
//! engine. It carries no process or runtime dependencies so the contracts can
//! be reused by tooling and tests.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Output from a decision process is untrusted: every malformed shape must
//! surface as `ScriptGateError`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorKind, Result, ScriptGateError};

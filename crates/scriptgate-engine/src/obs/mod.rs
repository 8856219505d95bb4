//! Lightweight in-process metrics.
//!
//! Evaluation outcomes, error kinds, live child processes and process
//! durations, stored as atomics and rendered by the `/metrics` handler.

pub mod metrics;

pub use metrics::{ActiveProcessGuard, EngineMetrics};

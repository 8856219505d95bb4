//! scriptgate engine library entry.
//!
//! Hosts external decision processes: configuration, the per-request process
//! runner with output/time bounds, the per-evaluator process pool, the
//! fail-safe evaluator, metrics and the HTTP surface. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod invoke;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod pool;
pub mod router;
pub mod transport;

pub use policy::ScriptEvaluator;

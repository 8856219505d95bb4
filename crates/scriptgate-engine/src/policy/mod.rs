//! Fail-safe policy layer.
//!
//! `ScriptEvaluator` composes request encoding, the process pool, the process
//! runner and decision decoding. Every failure on that path resolves to
//! `Decision::deny()`; callers never see an error.

pub mod evaluator;

pub use evaluator::ScriptEvaluator;

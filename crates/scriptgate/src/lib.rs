//! Top-level facade crate for scriptgate.
//!
//! Re-exports the wire contracts and the engine so users can depend on a single crate.

pub mod core {
    pub use scriptgate_core::*;
}

pub mod engine {
    pub use scriptgate_engine::*;
}

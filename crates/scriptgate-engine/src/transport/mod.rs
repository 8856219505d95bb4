//! Transport layer exports.
//!
//! `http` hosts the authorization endpoint.

pub mod http;

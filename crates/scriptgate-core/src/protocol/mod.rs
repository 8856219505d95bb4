//! Wire documents exchanged with an external decision process.
//!
//! - `request`: the authorization request written to the child's stdin.
//! - `decision`: the decision document read back from the child's stdout.
//!
//! The request side is produced by us and must be lossless. The decision side
//! comes from arbitrary code and is parsed defensively: anything that is not a
//! well-formed decision is reported as `ScriptGateError::Decode`.

pub mod decision;
pub mod request;

pub use decision::{decode_decision, Claim, Decision, DecisionStatus, ScriptDecision};
pub use request::{encode_request, Attribute, AuthorizationRequest, Identity, OAuthRequest};

//! Decision document (stdout of the decision process).
//!
//! Accepted shape:
//! ```json
//! { "status": "PROCEED", "claims": [ {"name": "org", "values": ["org1"]} ] }
//! ```
//! Parsing rules:
//! - `status` is required and matched case-sensitively (`PROCEED` / `DENY`).
//! - `claims` is optional; missing or `null` means no claims.
//! - A claim is `{name, values[]}`; the deprecated `{type, value}` form is
//!   normalized to `{name: type, values: [value]}`.
//! - Unknown keys are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ScriptGateError};

/// Final verdict of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionStatus {
    #[serde(rename = "PROCEED")]
    Proceed,
    #[serde(rename = "DENY")]
    Deny,
}

impl DecisionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionStatus::Proceed => "PROCEED",
            DecisionStatus::Deny => "DENY",
        }
    }

    /// Exact match only. `"Proceed"` is not `PROCEED`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PROCEED" => Some(DecisionStatus::Proceed),
            "DENY" => Some(DecisionStatus::Deny),
            _ => None,
        }
    }
}

/// Named, multi-valued grant. Values are relayed untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub name: String,
    pub values: Vec<Value>,
}

impl Claim {
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Decision exactly as the process reported it.
///
/// Not handed to callers directly: convert into `Decision`, which drops claims
/// on `DENY`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDecision {
    pub status: DecisionStatus,
    pub claims: Vec<Claim>,
}

/// Decision returned to callers.
///
/// Invariant: a `DENY` decision carries no claims.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    status: DecisionStatus,
    claims: Vec<Claim>,
}

impl Decision {
    pub fn deny() -> Self {
        Self {
            status: DecisionStatus::Deny,
            claims: Vec::new(),
        }
    }

    pub fn proceed(claims: Vec<Claim>) -> Self {
        Self {
            status: DecisionStatus::Proceed,
            claims,
        }
    }

    pub fn status(&self) -> DecisionStatus {
        self.status
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn is_proceed(&self) -> bool {
        self.status == DecisionStatus::Proceed
    }

    /// Boolean view for hosts whose contract is `(allowed, claims)`.
    pub fn as_verdict(&self) -> (bool, &[Claim]) {
        (self.is_proceed(), &self.claims)
    }
}

impl From<ScriptDecision> for Decision {
    fn from(d: ScriptDecision) -> Self {
        match d.status {
            DecisionStatus::Proceed => Decision::proceed(d.claims),
            DecisionStatus::Deny => Decision::deny(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireDecision {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    claims: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireClaim {
    Named {
        name: String,
        values: Vec<Value>,
    },
    /// Deprecated input shape.
    Legacy {
        #[serde(rename = "type")]
        claim_type: String,
        value: Value,
    },
}

impl From<WireClaim> for Claim {
    fn from(c: WireClaim) -> Self {
        match c {
            WireClaim::Named { name, values } => Claim { name, values },
            WireClaim::Legacy { claim_type, value } => {
                tracing::debug!(claim = %claim_type, "normalizing legacy {{type, value}} claim");
                let values = match value {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                Claim {
                    name: claim_type,
                    values,
                }
            }
        }
    }
}

/// Parse captured stdout into a decision. No partial results.
pub fn decode_decision(raw: &[u8]) -> Result<ScriptDecision> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(ScriptGateError::Decode("empty output".into()));
    }

    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| ScriptGateError::Decode(format!("invalid json: {e}")))?;
    // Derived struct impls also accept arrays; `["PROCEED"]` must not decode.
    if !value.is_object() {
        return Err(ScriptGateError::Decode("decision must be a JSON object".into()));
    }
    let wire: WireDecision = serde_json::from_value(value)
        .map_err(|e| ScriptGateError::Decode(format!("invalid decision: {e}")))?;

    let status = match wire.status {
        None | Some(Value::Null) => {
            return Err(ScriptGateError::Decode("missing status".into()));
        }
        Some(Value::String(s)) => DecisionStatus::parse(&s)
            .ok_or_else(|| ScriptGateError::Decode(format!("unrecognized status: {s:?}")))?,
        Some(other) => {
            return Err(ScriptGateError::Decode(format!(
                "status must be a string, got {other}"
            )));
        }
    };

    let claims = wire
        .claims
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, v)| decode_claim(i, v))
        .collect::<Result<Vec<_>>>()?;

    Ok(ScriptDecision { status, claims })
}

fn decode_claim(index: usize, value: Value) -> Result<Claim> {
    if !value.is_object() {
        return Err(ScriptGateError::Decode(format!(
            "claims[{index}] must be a JSON object"
        )));
    }
    serde_json::from_value::<WireClaim>(value)
        .map(Claim::from)
        .map_err(|_| {
            ScriptGateError::Decode(format!(
                "claims[{index}] is neither {{name, values}} nor {{type, value}}"
            ))
        })
}

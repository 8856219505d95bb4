//! Authorization request (stdin document).
//!
//! Shape:
//! ```json
//! {
//!   "attributes": [ {"name": "role", "values": ["admin"]} ],
//!   "identities": [ {"typeId": "userName", "value": "alice"} ],
//!   "request": { "clientID": "client1", "scope": "openid" }
//! }
//! ```
//! All three keys are always emitted; empty collections encode as `[]`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ScriptGateError};

/// Key carrying the OAuth client id inside `request`.
pub const CLIENT_ID_KEY: &str = "clientID";

/// Named, multi-valued attribute of the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Typed identifier asserted about the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Identity {
    /// Identity type (field name is `typeId` in JSON).
    #[serde(rename = "typeId")]
    pub type_id: String,
    pub value: String,
}

/// OAuth client request metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthRequest {
    #[serde(rename = "clientID", default)]
    pub client_id: String,
    /// Any further request parameters (scope, redirect_uri, ...).
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

/// One authorization check. Built by the caller, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationRequest {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub identities: Vec<Identity>,
    #[serde(default)]
    pub request: OAuthRequest,
}

impl AuthorizationRequest {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            request: OAuthRequest {
                client_id: client_id.into(),
                params: Map::new(),
            },
            ..Self::default()
        }
    }

    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.push(Attribute {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn with_identity(mut self, type_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.identities.push(Identity {
            type_id: type_id.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.params.insert(key.into(), value.into());
        self
    }

    pub fn client_id(&self) -> &str {
        &self.request.client_id
    }

    /// Encode to the stdin wire document.
    pub fn encode(&self) -> Result<Bytes> {
        encode_request(self)
    }
}

/// Encode a request into the canonical stdin document.
///
/// `clientID` lives in a dedicated field; a duplicate inside `params` would
/// produce an object with two `clientID` keys, so it is rejected.
pub fn encode_request(req: &AuthorizationRequest) -> Result<Bytes> {
    if req.request.params.contains_key(CLIENT_ID_KEY) {
        return Err(ScriptGateError::Encoding(format!(
            "request parameter {CLIENT_ID_KEY} duplicates the client id field"
        )));
    }
    serde_json::to_vec(req)
        .map(Bytes::from)
        .map_err(|e| ScriptGateError::Encoding(e.to_string()))
}

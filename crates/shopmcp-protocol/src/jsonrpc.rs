//! JSON-RPC 2.0 message framing.
//!
//! One request/response pair per exchange; batching is not part of this
//! protocol. A message without an `id` is a notification and never receives
//! a response.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::McpError;

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// Zero-sized version marker that serializes as `"2.0"` and rejects
/// anything else on deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let version = String::deserialize(deserializer)?;
        if version == JSONRPC_VERSION {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "invalid JSON-RPC version: expected '{JSONRPC_VERSION}', got '{version}'"
            )))
        }
    }
}

/// Request identifier: a number or a string, per JSON-RPC 2.0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier (what this client generates)
    Number(u64),
    /// String identifier (accepted from peers)
    String(String),
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// An incoming JSON-RPC message: a request when `id` is present, a
/// notification when it is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcIncoming {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: JsonRpcVersion,
    /// Request identifier; `None` marks a notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Method name, e.g. `tools/call`
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcIncoming {
    /// Build a request with an id.
    pub fn request(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Build a notification (no id, no response expected).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Whether this message expects a response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// An outgoing JSON-RPC response, carrying either `result` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcOutgoing {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: JsonRpcVersion,
    /// Identifier of the request being answered; `None` only for parse
    /// errors where the id could not be recovered
    pub id: Option<RequestId>,
    /// Successful result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcOutgoing {
    /// Build a success response.
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response from a protocol error.
    pub fn error(id: Option<RequestId>, err: McpError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            result: None,
            error: Some(JsonRpcError::from(err)),
        }
    }

    /// Responses to notifications must not be sent.
    pub fn should_send(&self) -> bool {
        self.id.is_some() || self.error.is_some()
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create a new error object.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Parse error (-32700).
    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(-32700, format!("Parse error: {}", details.into()))
    }

    /// Invalid request (-32600).
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(-32600, format!("Invalid Request: {}", reason.into()))
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Method not found: {method}"))
    }
}

impl From<McpError> for JsonRpcError {
    fn from(err: McpError) -> Self {
        Self::new(err.jsonrpc_code(), err.message)
    }
}

impl From<JsonRpcError> for McpError {
    fn from(err: JsonRpcError) -> Self {
        McpError::from_jsonrpc_code(err.code, err.message)
    }
}

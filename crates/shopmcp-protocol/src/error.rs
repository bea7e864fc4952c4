//! Unified error handling.
//!
//! A single [`McpError`] is used on both sides of the connection. The
//! [`ErrorKind`] enumeration is closed so callers can branch on kind
//! instead of matching message text, and every kind maps to a JSON-RPC
//! error code (and back) so the classification survives the wire.

use serde::{Deserialize, Serialize};

/// Result type alias for broker operations.
pub type McpResult<T> = Result<T, McpError>;

/// Unified error type for all broker operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// Error classification for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection could not be established or was dropped mid-exchange
    Transport,
    /// Operation invoked before initialization or after close
    State,
    /// `tools/call` named a tool absent from the dispatch table (-32001)
    ToolNotFound,
    /// A tool handler's delegated upstream call failed (-32002)
    ToolExecutionFailed,
    /// `prompts/get` named a prompt absent from the prompt map (-32003)
    PromptNotFound,
    /// Malformed JSON on the wire (-32700)
    ParseError,
    /// Structurally invalid request (-32600)
    InvalidRequest,
    /// Unknown method (-32601)
    MethodNotFound,
    /// Parameters did not match the declared schema (-32602)
    InvalidParams,
    /// Unclassified server-side failure (-32603)
    Internal,
    /// Payload could not be (de)serialized
    Serialization,
    /// Invalid startup configuration (e.g. duplicate tool registration)
    Configuration,
    /// An exchange exceeded its deadline
    Timeout,
}

impl McpError {
    /// Create a new error with kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Transport-level failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Protocol state violation (operation before init / after close).
    pub fn state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::State, message)
    }

    /// Tool not found in the dispatch table.
    pub fn tool_not_found(tool_name: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ToolNotFound,
            format!("Tool not found: {}", tool_name.into()),
        )
    }

    /// Tool handler's upstream collaborator failed.
    pub fn tool_execution_failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ToolExecutionFailed,
            format!("Tool '{}' failed: {}", tool_name.into(), reason.into()),
        )
    }

    /// Prompt not found in the prompt map.
    pub fn prompt_not_found(prompt_name: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::PromptNotFound,
            format!("Prompt not found: {}", prompt_name.into()),
        )
    }

    /// Malformed JSON.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    /// Structurally invalid request.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Unknown method.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::MethodNotFound,
            format!("Method not found: {}", method.into()),
        )
    }

    /// Parameters did not match the declared shape.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    /// Unclassified internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Serialization failure.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    /// Invalid startup configuration.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Deadline exceeded.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// JSON-RPC error code for this kind.
    pub fn jsonrpc_code(&self) -> i32 {
        match self.kind {
            ErrorKind::ToolNotFound => -32001,
            ErrorKind::ToolExecutionFailed => -32002,
            ErrorKind::PromptNotFound => -32003,
            ErrorKind::ParseError => -32700,
            ErrorKind::InvalidRequest | ErrorKind::State => -32600,
            ErrorKind::MethodNotFound => -32601,
            ErrorKind::InvalidParams => -32602,
            ErrorKind::Internal
            | ErrorKind::Transport
            | ErrorKind::Serialization
            | ErrorKind::Configuration
            | ErrorKind::Timeout => -32603,
        }
    }

    /// Recover the kind from a wire-level error code.
    ///
    /// Codes this mapping does not recognize come back as
    /// [`ErrorKind::Internal`]; the message is preserved either way.
    pub fn from_jsonrpc_code(code: i32, message: impl Into<String>) -> Self {
        let kind = match code {
            -32001 => ErrorKind::ToolNotFound,
            -32002 => ErrorKind::ToolExecutionFailed,
            -32003 => ErrorKind::PromptNotFound,
            -32700 => ErrorKind::ParseError,
            -32600 => ErrorKind::InvalidRequest,
            -32601 => ErrorKind::MethodNotFound,
            -32602 => ErrorKind::InvalidParams,
            _ => ErrorKind::Internal,
        };
        Self::new(kind, message)
    }
}

impl std::fmt::Display for McpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for McpError {}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind() {
        assert_eq!(McpError::transport("x").kind, ErrorKind::Transport);
        assert_eq!(McpError::state("x").kind, ErrorKind::State);
        assert_eq!(
            McpError::tool_not_found("calc").kind,
            ErrorKind::ToolNotFound
        );
        assert_eq!(
            McpError::prompt_not_found("p").kind,
            ErrorKind::PromptNotFound
        );
    }

    #[test]
    fn messages_carry_names() {
        let err = McpError::tool_not_found("get_customer_discount");
        assert!(err.message.contains("get_customer_discount"));

        let err = McpError::tool_execution_failed("check_product_inventory", "backend down");
        assert!(err.message.contains("check_product_inventory"));
        assert!(err.message.contains("backend down"));
    }

    #[test]
    fn code_mapping_roundtrips() {
        for err in [
            McpError::tool_not_found("t"),
            McpError::tool_execution_failed("t", "r"),
            McpError::prompt_not_found("p"),
            McpError::parse_error("p"),
            McpError::method_not_found("m"),
            McpError::invalid_params("p"),
        ] {
            let back = McpError::from_jsonrpc_code(err.jsonrpc_code(), err.message.clone());
            assert_eq!(back.kind, err.kind, "kind lost for {:?}", err.kind);
        }
    }

    #[test]
    fn unknown_code_degrades_to_internal() {
        let err = McpError::from_jsonrpc_code(-31999, "whatever");
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, "whatever");
    }
}

//! # shopmcp-protocol
//!
//! Wire types for the shopmcp tool/prompt broker.
//!
//! This crate defines everything that crosses the connection boundary:
//!
//! - **JSON-RPC 2.0**: request/response/notification framing with strict
//!   version checking ([`jsonrpc`])
//! - **Protocol types**: tool descriptors, call results, content blocks,
//!   prompt templates, and the initialization handshake ([`types`])
//! - **Errors**: the unified [`McpError`] with a closed [`ErrorKind`]
//!   enumeration and bidirectional JSON-RPC error-code mapping ([`error`])
//!
//! Higher layers (`shopmcp-client`, `shopmcp-server`) build on these types;
//! nothing in this crate performs I/O.

pub mod error;
pub mod jsonrpc;
pub mod types;

pub use error::{ErrorKind, McpError, McpResult};
pub use jsonrpc::{JsonRpcError, JsonRpcIncoming, JsonRpcOutgoing, RequestId};
pub use types::{
    CallToolRequest, CallToolResult, ContentBlock, GetPromptRequest, GetPromptResult,
    Implementation, InitializeRequest, InitializeResult, ListPromptsResult, ListToolsResult,
    Prompt, PromptArgument, PromptMessage, Role, TextContent, Tool, ToolInputSchema,
};

/// Protocol revision implemented by this workspace.
///
/// Clients request a version during `initialize`; the server echoes the
/// version it actually speaks. There is no multi-version negotiation here:
/// one revision is supported.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

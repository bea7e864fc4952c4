//! Protocol session.
//!
//! A [`Session`] wraps one transport with the initialization handshake and
//! the primitive operations: `tools/list`, `tools/call`, `prompts/list`,
//! `prompts/get`. Its lifecycle is a straight line:
//!
//! ```text
//! Unopened -> Open (connected) -> Initialized -> Closed (terminal)
//! ```
//!
//! `initialize` must be called exactly once before any other operation;
//! operations outside the valid state fail with [`ErrorKind::State`].
//! Within one session operations are strictly sequential: each call's
//! response is awaited before the caller can issue the next.
//!
//! [`ErrorKind::State`]: shopmcp_protocol::ErrorKind::State

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::Value;

use shopmcp_protocol::types::{
    CallToolRequest, CallToolResult, ClientCapabilities, GetPromptRequest, GetPromptResult,
    Implementation, InitializeRequest, InitializeResult, ListPromptsResult, ListToolsResult,
    Prompt, Tool,
};
use shopmcp_protocol::{McpError, McpResult, PROTOCOL_VERSION};
use shopmcp_transport::Transport;

use crate::protocol::ProtocolClient;

const STATE_UNOPENED: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_INITIALIZED: u8 = 2;
const STATE_CLOSED: u8 = 3;

/// One scoped protocol exchange over a transport.
pub struct Session<T: Transport> {
    protocol: ProtocolClient<T>,
    state: AtomicU8,
}

impl<T: Transport + 'static> Session<T> {
    /// Wrap a transport. Nothing is sent until [`initialize`].
    ///
    /// [`initialize`]: Session::initialize
    pub fn new(transport: T) -> Self {
        Self {
            protocol: ProtocolClient::new(transport),
            state: AtomicU8::new(STATE_UNOPENED),
        }
    }

    /// Perform the initialization handshake. Connects the transport if
    /// needed, sends `initialize`, and follows up with the
    /// `notifications/initialized` notification.
    ///
    /// Calling this twice, or on a closed session, is a state error.
    pub async fn initialize(&self) -> McpResult<InitializeResult> {
        match self.state.load(Ordering::Acquire) {
            STATE_CLOSED => return Err(McpError::state("session is closed")),
            STATE_INITIALIZED => return Err(McpError::state("session already initialized")),
            STATE_UNOPENED => {
                self.protocol.connect().await?;
                self.state.store(STATE_OPEN, Ordering::Release);
            }
            _ => {}
        }

        let request = InitializeRequest {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation::new("shopmcp-client", env!("CARGO_PKG_VERSION")),
        };

        let result: InitializeResult = self
            .protocol
            .request("initialize", Some(serde_json::to_value(&request)?))
            .await?;

        self.state.store(STATE_INITIALIZED, Ordering::Release);
        self.protocol.notify("notifications/initialized", None).await?;

        tracing::debug!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            "session initialized"
        );
        Ok(result)
    }

    fn ensure_initialized(&self) -> McpResult<()> {
        match self.state.load(Ordering::Acquire) {
            STATE_INITIALIZED => Ok(()),
            STATE_CLOSED => Err(McpError::state("session is closed")),
            _ => Err(McpError::state("session not initialized")),
        }
    }

    /// Enumerate the server's declared tools. Order is server-defined and
    /// not guaranteed stable across calls.
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        self.ensure_initialized()?;
        let result: ListToolsResult = self.protocol.request("tools/list", None).await?;
        Ok(result.tools)
    }

    /// Invoke a tool by name with arguments bound by parameter name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<HashMap<String, Value>>,
    ) -> McpResult<CallToolResult> {
        self.ensure_initialized()?;
        tracing::debug!(tool = name, ?arguments, "calling tool");
        let request = CallToolRequest {
            name: name.to_string(),
            arguments,
        };
        self.protocol
            .request("tools/call", Some(serde_json::to_value(&request)?))
            .await
    }

    /// Enumerate the server's declared prompt templates.
    pub async fn list_prompts(&self) -> McpResult<Vec<Prompt>> {
        self.ensure_initialized()?;
        let result: ListPromptsResult = self.protocol.request("prompts/list", None).await?;
        Ok(result.prompts)
    }

    /// Resolve a named prompt template rendered with the given arguments.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<HashMap<String, Value>>,
    ) -> McpResult<GetPromptResult> {
        self.ensure_initialized()?;
        tracing::debug!(prompt = name, ?arguments, "fetching prompt");
        let request = GetPromptRequest {
            name: name.to_string(),
            arguments,
        };
        self.protocol
            .request("prompts/get", Some(serde_json::to_value(&request)?))
            .await
    }

    /// Close the session. Terminal: no operation is valid afterwards.
    pub async fn close(&self) -> McpResult<()> {
        self.state.store(STATE_CLOSED, Ordering::Release);
        self.protocol.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{shop_responder, MockTransport};
    use shopmcp_protocol::ErrorKind;

    fn mock_session() -> Session<MockTransport> {
        Session::new(MockTransport::new(shop_responder()))
    }

    #[tokio::test]
    async fn operations_require_initialization() {
        let session = mock_session();
        let err = session.list_tools().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::State);

        let err = session.call_tool("check_product_inventory", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::State);
    }

    #[tokio::test]
    async fn initialize_is_exactly_once() {
        let session = mock_session();
        session.initialize().await.unwrap();
        let err = session.initialize().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::State);
    }

    #[tokio::test]
    async fn closed_session_rejects_everything() {
        let session = mock_session();
        session.initialize().await.unwrap();
        session.close().await.unwrap();

        assert_eq!(session.list_tools().await.unwrap_err().kind, ErrorKind::State);
        assert_eq!(session.initialize().await.unwrap_err().kind, ErrorKind::State);
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let session = mock_session();
        let result = session.initialize().await.unwrap();
        assert_eq!(result.server_info.name, "mock-shop");
    }

    #[tokio::test]
    async fn call_tool_returns_first_text_block() {
        let session = mock_session();
        session.initialize().await.unwrap();

        let mut args = HashMap::new();
        args.insert("product_id".to_string(), serde_json::json!("P1"));
        let result = session
            .call_tool("check_product_inventory", Some(args))
            .await
            .unwrap();

        let text = result.content[0].as_text().unwrap();
        assert!(text.contains("\"available\":true"));
    }

    #[tokio::test]
    async fn unknown_tool_surfaces_typed_error() {
        let session = mock_session();
        session.initialize().await.unwrap();

        let err = session.call_tool("no_such_tool", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ToolNotFound);
        assert!(err.message.contains("no_such_tool"));
    }

    #[tokio::test]
    async fn repeated_calls_yield_identical_results() {
        let session = mock_session();
        session.initialize().await.unwrap();

        let mut args = HashMap::new();
        args.insert("product_id".to_string(), serde_json::json!("P1"));
        let first = session
            .call_tool("check_product_inventory", Some(args.clone()))
            .await
            .unwrap();
        let second = session
            .call_tool("check_product_inventory", Some(args))
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}

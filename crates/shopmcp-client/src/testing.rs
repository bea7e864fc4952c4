//! In-process transport for unit tests: requests are answered by a
//! responder closure, responses flow back through the inbound channel.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use shopmcp_protocol::jsonrpc::{JsonRpcIncoming, JsonRpcOutgoing};
use shopmcp_protocol::McpError;
use shopmcp_transport::{Transport, TransportMessage, TransportResult, TransportState};

pub(crate) type Responder =
    Arc<dyn Fn(JsonRpcIncoming) -> Option<JsonRpcOutgoing> + Send + Sync>;

pub(crate) struct MockTransport {
    inbound_tx: mpsc::Sender<TransportMessage>,
    inbound_rx: Mutex<mpsc::Receiver<TransportMessage>>,
    responder: Responder,
    /// Methods seen, in order; shared so tests can count fetches across
    /// transports created by a factory.
    pub(crate) seen_methods: Arc<std::sync::Mutex<Vec<String>>>,
}

impl MockTransport {
    pub(crate) fn new(responder: Responder) -> Self {
        Self::with_log(responder, Arc::new(std::sync::Mutex::new(Vec::new())))
    }

    pub(crate) fn with_log(
        responder: Responder,
        seen_methods: Arc<std::sync::Mutex<Vec<String>>>,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        Self {
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            responder,
            seen_methods,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> TransportResult<()> {
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        let request: JsonRpcIncoming = serde_json::from_slice(&message.payload)
            .unwrap_or_else(|e| panic!("mock received invalid JSON-RPC: {e}"));
        if let Ok(mut log) = self.seen_methods.lock() {
            log.push(request.method.clone());
        }
        if let Some(response) = (self.responder)(request) {
            let payload = serde_json::to_vec(&response).unwrap();
            let _ = self.inbound_tx.send(TransportMessage::new(payload)).await;
        }
        Ok(())
    }

    async fn recv(&self) -> TransportResult<Option<TransportMessage>> {
        Ok(self.inbound_rx.lock().await.recv().await)
    }

    async fn close(&self) -> TransportResult<()> {
        Ok(())
    }

    async fn state(&self) -> TransportState {
        TransportState::Connected
    }
}

/// Responder mimicking the shop server: four declared tools, the
/// `agentPrompt` template, typed errors for unknown names.
pub(crate) fn shop_responder() -> Responder {
    Arc::new(|request: JsonRpcIncoming| {
        let id = request.id.clone()?;
        let result = match request.method.as_str() {
            "initialize" => serde_json::json!({
                "protocolVersion": shopmcp_protocol::PROTOCOL_VERSION,
                "capabilities": {"tools": {}, "prompts": {}},
                "serverInfo": {"name": "mock-shop", "version": "0.0.1"},
            }),
            "tools/list" => serde_json::json!({
                "tools": [
                    {
                        "name": "check_product_inventory",
                        "description": "Check inventory availability for a specific product",
                        "inputSchema": {
                            "type": "object",
                            "properties": {"product_id": {"type": "string"}},
                            "required": ["product_id"],
                        },
                    },
                    {
                        "name": "get_customer_discount",
                        "description": "Calculate available discounts for a customer",
                        "inputSchema": {
                            "type": "object",
                            "properties": {"customer_id": {"type": "string"}},
                            "required": ["customer_id"],
                        },
                    },
                ],
            }),
            "tools/call" => {
                let params = request.params.unwrap_or_default();
                let name = params["name"].as_str().unwrap_or_default();
                match name {
                    "check_product_inventory" => serde_json::json!({
                        "content": [{
                            "type": "text",
                            "text": "{\"product_id\":\"P1\",\"available\":true}",
                        }],
                    }),
                    "get_customer_discount" => serde_json::json!({
                        "content": [{"type": "text", "text": "plain text discount note"}],
                    }),
                    _ => {
                        return Some(JsonRpcOutgoing::error(
                            Some(id),
                            McpError::tool_not_found(name),
                        ));
                    }
                }
            }
            "prompts/get" => {
                let params = request.params.unwrap_or_default();
                if params["name"].as_str() == Some("agentPrompt") {
                    let agent = params["arguments"]["agent_name"].as_str().unwrap_or_default();
                    if agent == "silent" {
                        // Zero-message edge case
                        serde_json::json!({"messages": []})
                    } else {
                        serde_json::json!({
                            "messages": [{
                                "role": "user",
                                "content": {"type": "text", "text": format!("You are {agent}.")},
                            }],
                        })
                    }
                } else {
                    return Some(JsonRpcOutgoing::error(
                        Some(id),
                        McpError::prompt_not_found(
                            params["name"].as_str().unwrap_or_default(),
                        ),
                    ));
                }
            }
            method => {
                return Some(JsonRpcOutgoing::error(
                    Some(id),
                    McpError::method_not_found(method),
                ));
            }
        };
        Some(JsonRpcOutgoing::success(Some(id), result))
    })
}

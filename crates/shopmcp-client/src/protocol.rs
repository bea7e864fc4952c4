//! JSON-RPC protocol client.
//!
//! Sequence per request: register a waiter with the dispatcher, send the
//! serialized request, await the routed response, map wire errors back to
//! [`McpError`] by code. Request ids are generated from a process-local
//! counter; notifications carry no id and await nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use shopmcp_protocol::jsonrpc::JsonRpcIncoming;
use shopmcp_protocol::{McpError, McpResult, RequestId};
use shopmcp_transport::{Transport, TransportMessage};

use crate::dispatcher::MessageDispatcher;

/// Default per-request deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Correlated JSON-RPC request/response over a [`Transport`].
pub(crate) struct ProtocolClient<T: Transport> {
    transport: Arc<T>,
    dispatcher: Arc<MessageDispatcher>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl<T: Transport + 'static> ProtocolClient<T> {
    /// Wrap a transport and start the routing task.
    pub(crate) fn new(transport: T) -> Self {
        let transport = Arc::new(transport);
        let dispatcher = MessageDispatcher::spawn(Arc::clone(&transport));
        Self {
            transport,
            dispatcher,
            next_id: AtomicU64::new(1),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Connect the underlying transport.
    pub(crate) async fn connect(&self) -> McpResult<()> {
        self.transport.connect().await.map_err(McpError::from)
    }

    /// Close the underlying transport and stop routing.
    pub(crate) async fn close(&self) -> McpResult<()> {
        self.dispatcher.shutdown();
        self.transport.close().await.map_err(McpError::from)
    }

    /// Send a request and await its typed response.
    pub(crate) async fn request<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> McpResult<R> {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));

        // Register before sending so the response cannot arrive unrouted.
        let receiver = self.dispatcher.register(id.clone()).await;

        let request = JsonRpcIncoming::request(id.clone(), method, params);
        let payload = serde_json::to_vec(&request)
            .map_err(|e| McpError::serialization(format!("failed to serialize {method}: {e}")))?;

        if let Err(e) = self.transport.send(TransportMessage::new(payload)).await {
            self.dispatcher.forget(&id).await;
            return Err(McpError::from(e));
        }

        let response = match tokio::time::timeout(self.request_timeout, receiver).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(McpError::transport(format!(
                    "connection closed while awaiting {method} response"
                )));
            }
            Err(_) => {
                self.dispatcher.forget(&id).await;
                return Err(McpError::timeout(format!(
                    "{method} timed out after {:?}",
                    self.request_timeout
                )));
            }
        };

        if let Some(error) = response.error {
            return Err(McpError::from(error));
        }

        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| McpError::serialization(format!("failed to decode {method} result: {e}")))
    }

    /// Send a notification; no response is expected.
    pub(crate) async fn notify(&self, method: &str, params: Option<Value>) -> McpResult<()> {
        let notification = JsonRpcIncoming::notification(method, params);
        let payload = serde_json::to_vec(&notification)
            .map_err(|e| McpError::serialization(format!("failed to serialize {method}: {e}")))?;
        self.transport
            .send(TransportMessage::new(payload))
            .await
            .map_err(McpError::from)
    }
}

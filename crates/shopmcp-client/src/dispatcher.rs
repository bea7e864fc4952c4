//! Inbound message routing.
//!
//! Exactly one task consumes `transport.recv()`; it routes each response to
//! the call waiting on that request id via a oneshot channel. This keeps
//! request/response correlation in one place and leaves no second consumer
//! to race against.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use shopmcp_protocol::jsonrpc::JsonRpcOutgoing;
use shopmcp_protocol::RequestId;
use shopmcp_transport::Transport;

type Waiters = Arc<Mutex<HashMap<RequestId, oneshot::Sender<JsonRpcOutgoing>>>>;

/// Routes inbound responses to registered waiters.
pub(crate) struct MessageDispatcher {
    waiters: Waiters,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl MessageDispatcher {
    /// Spawn the routing task over the given transport.
    pub(crate) fn spawn<T: Transport + 'static>(transport: Arc<T>) -> Arc<Self> {
        let waiters: Waiters = Arc::new(Mutex::new(HashMap::new()));
        let task_waiters = Arc::clone(&waiters);

        let handle = tokio::spawn(async move {
            loop {
                match transport.recv().await {
                    Ok(Some(message)) => {
                        Self::route(&task_waiters, &message.payload).await;
                    }
                    Ok(None) => {
                        tracing::debug!("transport closed, dispatcher stopping");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "transport receive failed, dispatcher stopping");
                        break;
                    }
                }
            }
            // Dropping the senders wakes every pending call with a closed
            // channel, which surfaces as a transport error there.
            task_waiters.lock().await.clear();
        });

        Arc::new(Self {
            waiters,
            task: std::sync::Mutex::new(Some(handle)),
        })
    }

    async fn route(waiters: &Waiters, payload: &[u8]) {
        let response: JsonRpcOutgoing = match serde_json::from_slice(payload) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable inbound message");
                return;
            }
        };

        // A message with neither result nor error is not a response
        // (e.g. a server notification); nothing waits on those.
        if response.result.is_none() && response.error.is_none() {
            tracing::debug!("dropping inbound non-response message");
            return;
        }

        let Some(id) = response.id.clone() else {
            tracing::warn!("dropping response without id");
            return;
        };

        match waiters.lock().await.remove(&id) {
            Some(tx) => {
                // The waiter may have timed out and dropped its receiver.
                let _ = tx.send(response);
            }
            None => {
                tracing::warn!(%id, "no waiter registered for response id");
            }
        }
    }

    /// Register interest in the response to `id`. Must be called before the
    /// request is sent, or the response could arrive unrouted.
    pub(crate) async fn register(&self, id: RequestId) -> oneshot::Receiver<JsonRpcOutgoing> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().await.insert(id, tx);
        rx
    }

    /// Drop the waiter for `id` (send failure or timeout).
    pub(crate) async fn forget(&self, id: &RequestId) {
        self.waiters.lock().await.remove(id);
    }

    /// Stop the routing task.
    pub(crate) fn shutdown(&self) {
        if let Ok(mut guard) = self.task.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for MessageDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

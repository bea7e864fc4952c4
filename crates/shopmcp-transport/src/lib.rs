//! # shopmcp-transport
//!
//! Transport layer for the shopmcp broker.
//!
//! A [`Transport`] carries opaque JSON-RPC payloads between peers; it knows
//! nothing about methods or request ids. The one production implementation
//! is [`SseClientTransport`]: HTTP POST for outbound messages, a
//! Server-Sent-Events stream for inbound ones.
//!
//! Transports are scoped: dropping one (or calling [`Transport::close`])
//! tears down the connection and aborts any in-flight exchange. There is no
//! automatic reconnect; callers own retry policy.

mod sse;

pub use sse::{SseClientConfig, SseClientTransport};

use async_trait::async_trait;
use bytes::Bytes;
use shopmcp_protocol::McpError;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport-level failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    /// Connection dropped mid-exchange
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// Operation attempted while disconnected
    #[error("transport not connected")]
    NotConnected,
    /// The server never completed the connection handshake
    #[error("handshake failed: {0}")]
    Handshake(String),
    /// Payload could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<TransportError> for McpError {
    fn from(err: TransportError) -> Self {
        McpError::transport(err.to_string())
    }
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// No connection
    Disconnected,
    /// Connection being established
    Connecting,
    /// Ready to send and receive
    Connected,
}

/// One opaque message crossing the transport.
#[derive(Debug, Clone)]
pub struct TransportMessage {
    /// Serialized JSON-RPC payload
    pub payload: Bytes,
}

impl TransportMessage {
    /// Wrap a serialized payload.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// Bidirectional message transport.
///
/// `recv` yields `Ok(None)` once the connection has closed; after that the
/// transport is spent. Implementations must guarantee that dropping the
/// transport closes the underlying connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the connection. Must be called before `send`/`recv`.
    async fn connect(&self) -> TransportResult<()>;

    /// Send one message to the peer.
    async fn send(&self, message: TransportMessage) -> TransportResult<()>;

    /// Receive the next inbound message; `None` means the connection closed.
    async fn recv(&self) -> TransportResult<Option<TransportMessage>>;

    /// Tear down the connection and abort any in-flight exchange.
    async fn close(&self) -> TransportResult<()>;

    /// Current connection state.
    async fn state(&self) -> TransportState;
}

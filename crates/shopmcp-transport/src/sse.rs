//! SSE client transport.
//!
//! Connects to a streaming endpoint (`GET {url}` with
//! `Accept: text/event-stream`). The server's first event must be an
//! `endpoint` event naming the URL to POST JSON-RPC messages to; subsequent
//! `message` events carry inbound JSON-RPC payloads. Outbound messages are
//! POSTed to the discovered endpoint, which normally answers `202 Accepted`
//! and delivers the response over the stream; servers that answer with an
//! inline JSON body are handled too.
//!
//! One transport is one connection. Closing (or dropping) the transport
//! aborts the stream reader, which aborts any in-flight exchange.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;

use crate::{Transport, TransportError, TransportMessage, TransportResult, TransportState};

/// Inbound channel depth before the stream reader applies backpressure.
const INBOUND_CHANNEL_CAPACITY: usize = 256;

/// SSE client transport configuration.
#[derive(Debug, Clone)]
pub struct SseClientConfig {
    /// Full SSE endpoint URL, e.g. `http://localhost:8000/sse`
    pub url: String,
    /// How long to wait for the server's `endpoint` event before giving up
    pub handshake_timeout: Duration,
}

impl Default for SseClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/sse".to_string(),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl SseClientConfig {
    /// Config pointing at the given SSE endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

type SharedSender = Arc<Mutex<Option<mpsc::Sender<TransportMessage>>>>;

/// SSE client transport: POST out, event stream in.
pub struct SseClientTransport {
    config: SseClientConfig,
    http: reqwest::Client,
    state: Arc<RwLock<TransportState>>,
    /// POST target discovered via the `endpoint` event
    message_endpoint: Arc<RwLock<Option<String>>>,
    /// Receiving half of the inbound channel; populated by `connect`
    inbound_rx: Mutex<Option<mpsc::Receiver<TransportMessage>>>,
    /// Sender used for inline POST responses; cleared when the stream ends
    /// so the channel closes and `recv` observes end-of-connection
    inline_tx: SharedSender,
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SseClientTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseClientTransport")
            .field("url", &self.config.url)
            .finish()
    }
}

impl SseClientTransport {
    /// Create a transport for the given configuration. No I/O happens until
    /// [`Transport::connect`].
    pub fn new(config: SseClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            config,
            http,
            state: Arc::new(RwLock::new(TransportState::Disconnected)),
            message_endpoint: Arc::new(RwLock::new(None)),
            inbound_rx: Mutex::new(None),
            inline_tx: Arc::new(Mutex::new(None)),
            reader: std::sync::Mutex::new(None),
        }
    }

    /// Transport for an SSE endpoint URL with default settings.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self::new(SseClientConfig::new(url))
    }

    fn abort_reader(&self) {
        if let Ok(mut guard) = self.reader.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }

    /// Abort the reader and release every sender so `recv` unblocks.
    async fn teardown(&self) {
        self.abort_reader();
        *self.inline_tx.lock().await = None;
        *self.message_endpoint.write().await = None;
        *self.state.write().await = TransportState::Disconnected;
    }

    /// Stream reader: parses SSE events and feeds the inbound channel until
    /// the stream ends or the transport is dropped.
    async fn reader_loop(
        response: reqwest::Response,
        base_url: String,
        inbound: mpsc::Sender<TransportMessage>,
        inline_tx: SharedSender,
        message_endpoint: Arc<RwLock<Option<String>>>,
        mut endpoint_tx: Option<oneshot::Sender<String>>,
        state: Arc<RwLock<TransportState>>,
    ) {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        'outer: while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!(error = %e, "error reading SSE stream");
                    break;
                }
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find("\n\n") {
                let raw = buffer[..pos].to_string();
                buffer.drain(..=pos + 1);

                let event = parse_event(&raw);
                if event.data.is_empty() {
                    continue;
                }
                let data = event.data.join("\n");

                match event.name.as_deref() {
                    Some("endpoint") => match resolve_endpoint(&base_url, data.trim()) {
                        Ok(endpoint) => {
                            tracing::debug!(%endpoint, "discovered message endpoint");
                            *message_endpoint.write().await = Some(endpoint.clone());
                            if let Some(tx) = endpoint_tx.take() {
                                let _ = tx.send(endpoint);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "invalid endpoint event");
                            break 'outer;
                        }
                    },
                    Some("message") | None => {
                        if data.trim().is_empty() {
                            continue;
                        }
                        if let Err(e) = serde_json::from_str::<serde_json::Value>(&data) {
                            tracing::warn!(error = %e, "dropping non-JSON message event");
                            continue;
                        }
                        if inbound
                            .send(TransportMessage::new(data.into_bytes()))
                            .await
                            .is_err()
                        {
                            break 'outer;
                        }
                    }
                    Some(other) => {
                        tracing::debug!(event = other, "ignoring SSE event");
                    }
                }
            }
        }

        // Drop every sender so recv() observes the closed connection.
        *inline_tx.lock().await = None;
        *state.write().await = TransportState::Disconnected;
        tracing::debug!("SSE stream ended");
    }
}

#[async_trait::async_trait]
impl Transport for SseClientTransport {
    async fn connect(&self) -> TransportResult<()> {
        if *self.state.read().await == TransportState::Connected {
            return Ok(());
        }
        *self.state.write().await = TransportState::Connecting;

        let response = self
            .http
            .get(&self.config.url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        if !response.status().is_success() {
            *self.state.write().await = TransportState::Disconnected;
            return Err(TransportError::ConnectFailed(format!(
                "SSE connect returned {}",
                response.status()
            )));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let (endpoint_tx, endpoint_rx) = oneshot::channel();

        *self.inbound_rx.lock().await = Some(inbound_rx);
        *self.inline_tx.lock().await = Some(inbound_tx.clone());

        let task = tokio::spawn(Self::reader_loop(
            response,
            self.config.url.clone(),
            inbound_tx,
            Arc::clone(&self.inline_tx),
            Arc::clone(&self.message_endpoint),
            Some(endpoint_tx),
            Arc::clone(&self.state),
        ));
        if let Ok(mut guard) = self.reader.lock() {
            *guard = Some(task);
        }

        // The endpoint event is the handshake; without it there is nowhere
        // to POST requests.
        match tokio::time::timeout(self.config.handshake_timeout, endpoint_rx).await {
            Ok(Ok(_endpoint)) => {}
            Ok(Err(_)) => {
                self.teardown().await;
                return Err(TransportError::Handshake(
                    "stream closed before endpoint event".to_string(),
                ));
            }
            Err(_) => {
                self.teardown().await;
                return Err(TransportError::Handshake(format!(
                    "no endpoint event within {:?}",
                    self.config.handshake_timeout
                )));
            }
        }

        *self.state.write().await = TransportState::Connected;
        tracing::debug!(url = %self.config.url, "SSE transport connected");
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        if *self.state.read().await != TransportState::Connected {
            return Err(TransportError::NotConnected);
        }
        let endpoint = self
            .message_endpoint
            .read()
            .await
            .clone()
            .ok_or(TransportError::NotConnected)?;

        let response = self
            .http
            .post(&endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .body(message.payload.to_vec())
            .send()
            .await
            .map_err(|e| TransportError::ConnectionLost(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::ConnectionLost(format!(
                "POST to message endpoint returned {}",
                response.status()
            )));
        }

        // 202 Accepted means the response arrives over the stream. Some
        // servers answer inline with JSON; queue that as an inbound message.
        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        if is_json {
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::ConnectionLost(e.to_string()))?;
            if !body.is_empty() {
                if let Some(tx) = self.inline_tx.lock().await.as_ref() {
                    let _ = tx.send(TransportMessage::new(body)).await;
                }
            }
        }

        Ok(())
    }

    async fn recv(&self) -> TransportResult<Option<TransportMessage>> {
        let mut guard = self.inbound_rx.lock().await;
        let Some(rx) = guard.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        Ok(rx.recv().await)
    }

    async fn close(&self) -> TransportResult<()> {
        self.teardown().await;
        tracing::debug!("SSE transport closed");
        Ok(())
    }

    async fn state(&self) -> TransportState {
        *self.state.read().await
    }
}

impl Drop for SseClientTransport {
    fn drop(&mut self) {
        // Scope exit must kill the connection even without an explicit close.
        self.abort_reader();
    }
}

/// One parsed SSE event.
#[derive(Debug, Default, PartialEq, Eq)]
struct SseEvent {
    name: Option<String>,
    data: Vec<String>,
}

/// Parse one raw SSE event (the text between blank-line delimiters).
fn parse_event(raw: &str) -> SseEvent {
    let mut event = SseEvent::default();
    for line in raw.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.find(':') {
            Some(pos) => (&line[..pos], line[pos + 1..].trim_start()),
            None => (line, ""),
        };
        match field {
            "event" => event.name = Some(value.to_string()),
            "data" => event.data.push(value.to_string()),
            _ => {}
        }
    }
    event
}

/// Resolve the endpoint-event payload against the SSE URL. The payload may
/// be absolute or relative (`/messages/{session}` is the common case).
fn resolve_endpoint(base_url: &str, endpoint: &str) -> TransportResult<String> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(endpoint.to_string());
    }
    let base = Url::parse(base_url)
        .map_err(|e| TransportError::Handshake(format!("invalid base URL '{base_url}': {e}")))?;
    let resolved = base
        .join(endpoint)
        .map_err(|e| TransportError::Handshake(format!("invalid endpoint '{endpoint}': {e}")))?;
    Ok(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_event_with_name_and_data() {
        let event = parse_event("event: endpoint\ndata: /messages/abc");
        assert_eq!(event.name.as_deref(), Some("endpoint"));
        assert_eq!(event.data, vec!["/messages/abc"]);
    }

    #[test]
    fn parse_event_joins_multiline_data() {
        let event = parse_event("data: {\"a\":\ndata: 1}");
        assert_eq!(event.name, None);
        assert_eq!(event.data.join("\n"), "{\"a\":\n1}");
    }

    #[test]
    fn parse_event_skips_comments() {
        let event = parse_event(": keep-alive\ndata: x");
        assert_eq!(event.data, vec!["x"]);
    }

    #[test]
    fn resolve_endpoint_passes_absolute_through() {
        let resolved =
            resolve_endpoint("http://localhost:8000/sse", "http://other:9000/messages/1").unwrap();
        assert_eq!(resolved, "http://other:9000/messages/1");
    }

    #[test]
    fn resolve_endpoint_joins_origin_relative() {
        let resolved = resolve_endpoint("http://localhost:8000/sse", "/messages/abc").unwrap();
        assert_eq!(resolved, "http://localhost:8000/messages/abc");
    }

    #[test]
    fn default_config_points_at_local_sse() {
        let config = SseClientConfig::default();
        assert_eq!(config.url, "http://localhost:8000/sse");
    }

    #[tokio::test]
    async fn send_before_connect_is_rejected() {
        let transport = SseClientTransport::new(SseClientConfig::default());
        let err = transport
            .send(TransportMessage::new("{}".as_bytes().to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }
}

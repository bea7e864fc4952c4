//! HTTP/SSE transport.
//!
//! - `GET /sse` opens a session: the stream's first event is an `endpoint`
//!   event naming `/messages/{session_id}`, followed by `message` events
//!   carrying JSON-RPC responses, with periodic keep-alives.
//! - `POST /messages/{session_id}` submits one JSON-RPC message; the
//!   response (if any) is pushed onto that session's stream and the POST
//!   answers `202 Accepted`.
//!
//! Session state is dropped when the SSE connection closes.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use futures::stream::Stream;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use shopmcp_protocol::{McpError, McpResult};

use crate::config::ServerConfig;
use crate::router::{route_text, ShopDispatch};

/// Per-session outbound queue depth.
const SESSION_CHANNEL_CAPACITY: usize = 100;

/// SSE keep-alive interval.
const SSE_KEEP_ALIVE_SECS: u64 = 15;

/// Live SSE sessions: session id to outbound message queue.
#[derive(Clone, Default)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, mpsc::Sender<String>>>>,
}

impl SessionManager {
    /// Empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session; returns its id and the receiving half of its
    /// queue.
    pub async fn create_session(&self) -> (String, mpsc::Receiver<String>) {
        let session_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), tx);
        tracing::debug!(session = %session_id, "created SSE session");
        (session_id, rx)
    }

    /// Drop a session.
    pub async fn remove_session(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
        tracing::debug!(session = %session_id, "removed SSE session");
    }

    /// Whether a session exists.
    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Queue a message onto a session's stream. False if the session is
    /// gone or its queue is full.
    pub async fn send_to_session(&self, session_id: &str, message: &str) -> bool {
        let tx = match self.sessions.read().await.get(session_id) {
            Some(tx) => tx.clone(),
            None => return false,
        };
        tx.send(message.to_string()).await.is_ok()
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[derive(Clone)]
struct AppState {
    dispatch: Arc<ShopDispatch>,
    sessions: SessionManager,
}

/// Build the axum router for the broker.
pub fn router(dispatch: Arc<ShopDispatch>, max_body_size: usize) -> Router {
    let state = AppState {
        dispatch,
        sessions: SessionManager::new(),
    };

    Router::new()
        .route("/sse", get(handle_sse))
        .route("/messages/{session_id}", post(handle_message))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until the process exits.
pub async fn serve(dispatch: Arc<ShopDispatch>, config: &ServerConfig) -> McpResult<()> {
    let listener = TcpListener::bind(&config.bind_addr).await.map_err(|e| {
        McpError::internal(format!("failed to bind {}: {e}", config.bind_addr))
    })?;
    serve_with_listener(dispatch, listener, config.max_body_size).await
}

/// Serve on an already-bound listener (lets tests use an ephemeral port).
pub async fn serve_with_listener(
    dispatch: Arc<ShopDispatch>,
    listener: TcpListener,
    max_body_size: usize,
) -> McpResult<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| McpError::internal(format!("listener has no local address: {e}")))?;
    tracing::info!(
        "shop server listening on http://{addr} (GET /sse; POST /messages/{{session_id}})"
    );

    axum::serve(listener, router(dispatch, max_body_size))
        .await
        .map_err(|e| McpError::internal(format!("server error: {e}")))
}

async fn handle_sse(State(state): State<AppState>) -> impl IntoResponse {
    let (session_id, mut rx) = state.sessions.create_session().await;
    let endpoint = format!("/messages/{session_id}");

    let stream = async_stream::stream! {
        // Endpoint discovery event first; the client POSTs there.
        yield Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint));

        while let Some(message) = rx.recv().await {
            yield Ok(Event::default().event("message").data(message));
        }
    };

    let stream = CleanupStream {
        inner: Box::pin(stream),
        sessions: state.sessions.clone(),
        session_id,
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}

async fn handle_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: String,
) -> impl IntoResponse {
    if !state.sessions.contains(&session_id).await {
        tracing::warn!(session = %session_id, "message for unknown session");
        return StatusCode::NOT_FOUND.into_response();
    }

    let Some(response) = route_text(&state.dispatch, &body).await else {
        // Notification: accepted, nothing to deliver.
        return StatusCode::ACCEPTED.into_response();
    };

    if !state.sessions.send_to_session(&session_id, &response).await {
        tracing::warn!(session = %session_id, "session closed before response delivery");
        return StatusCode::GONE.into_response();
    }

    StatusCode::ACCEPTED.into_response()
}

/// Stream wrapper that drops the session when the connection closes.
struct CleanupStream<S> {
    inner: std::pin::Pin<Box<S>>,
    sessions: SessionManager,
    session_id: String,
}

impl<S: Stream<Item = Result<Event, Infallible>>> Stream for CleanupStream<S> {
    type Item = Result<Event, Infallible>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<S> Drop for CleanupStream<S> {
    fn drop(&mut self) {
        let sessions = self.sessions.clone();
        let session_id = std::mem::take(&mut self.session_id);
        // Cannot await in Drop; hand cleanup to the runtime.
        tokio::spawn(async move {
            sessions.remove_session(&session_id).await;
        });
    }
}

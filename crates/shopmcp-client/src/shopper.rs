//! Shopper client facade.
//!
//! The public operation set over the shopping tool surface: discover tools,
//! invoke them by name (plus four fixed-name convenience wrappers), fetch
//! agent prompts. One protocol session is kept open and reused across calls
//! (acquire/use/release through a mutex, which also makes operations
//! strictly sequential); a session whose transport breaks is discarded so
//! the next call reconnects.
//!
//! [`shared_client`] exposes the process-wide instance: constructed and its
//! tool cache populated exactly once, even under concurrent first access.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard, OnceCell, RwLock};

use shopmcp_protocol::{ErrorKind, McpError, McpResult, Tool};
use shopmcp_transport::{SseClientTransport, Transport};

use crate::decode::{decode, ToolOutput};
use crate::llm::{to_llm_format, FunctionSpec};
use crate::session::Session;

/// Default broker endpoint.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000/sse";

type TransportFactory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Client facade for the shopping tool surface.
///
/// Generic over the transport so tests can run in-process; production code
/// uses the [`SseClientTransport`] default via [`ShopperClient::new`].
pub struct ShopperClient<T: Transport + 'static = SseClientTransport> {
    base_url: String,
    make_transport: TransportFactory<T>,
    session: Mutex<Option<Session<T>>>,
    tools: RwLock<Vec<Tool>>,
}

impl ShopperClient<SseClientTransport> {
    /// Client for the SSE endpoint at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let base_url = url.into();
        let factory_url = base_url.clone();
        Self::with_transport(base_url, move || {
            SseClientTransport::for_url(factory_url.clone())
        })
    }
}

impl Default for ShopperClient<SseClientTransport> {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

impl<T: Transport + 'static> ShopperClient<T> {
    /// Client with a custom transport factory. The factory is invoked each
    /// time a fresh session must be opened.
    pub fn with_transport(
        base_url: impl Into<String>,
        make_transport: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            make_transport: Arc::new(make_transport),
            session: Mutex::new(None),
            tools: RwLock::new(Vec::new()),
        }
    }

    /// The configured server URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Acquire the shared session, opening and initializing one if none is
    /// held. The returned guard serializes operations on the session.
    async fn acquire(&self) -> McpResult<MutexGuard<'_, Option<Session<T>>>> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            let session = Session::new((self.make_transport)());
            if let Err(err) = session.initialize().await {
                tracing::error!(url = %self.base_url, error = %err, "failed to open session");
                return Err(err);
            }
            *guard = Some(session);
        }
        Ok(guard)
    }

    /// Errors that poison the held session; the next call reconnects.
    fn is_session_fatal(err: &McpError) -> bool {
        matches!(
            err.kind,
            ErrorKind::Transport | ErrorKind::State | ErrorKind::Timeout
        )
    }

    async fn release_broken(guard: &mut MutexGuard<'_, Option<Session<T>>>) {
        if let Some(session) = guard.take() {
            let _ = session.close().await;
        }
    }

    /// List the server's declared tools and refresh the cached listing.
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let mut guard = self.acquire().await?;
        let session = guard
            .as_ref()
            .ok_or_else(|| McpError::state("session unavailable"))?;

        match session.list_tools().await {
            Ok(tools) => {
                *self.tools.write().await = tools.clone();
                Ok(tools)
            }
            Err(err) => {
                tracing::error!(error = %err, "listing tools failed");
                if Self::is_session_fatal(&err) {
                    Self::release_broken(&mut guard).await;
                }
                Err(err)
            }
        }
    }

    /// The tool listing cached by the last successful `list_tools`.
    pub async fn cached_tools(&self) -> Vec<Tool> {
        self.tools.read().await.clone()
    }

    /// The declared tools in LLM function-spec format.
    ///
    /// Degrades to an empty list on any upstream failure: an empty tool set
    /// is a safe default for a language-model integration.
    pub async fn llm_tools(&self) -> Vec<FunctionSpec> {
        match self.list_tools().await {
            Ok(tools) => to_llm_format(&tools),
            Err(err) => {
                tracing::error!(error = %err, "listing tools for LLM format failed");
                Vec::new()
            }
        }
    }

    /// Invoke a tool by name and decode its result.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<HashMap<String, Value>>,
    ) -> McpResult<ToolOutput> {
        let mut guard = self.acquire().await?;
        let session = guard
            .as_ref()
            .ok_or_else(|| McpError::state("session unavailable"))?;

        match session.call_tool(name, arguments.clone()).await {
            Ok(result) => Ok(decode(&result)),
            Err(err) => {
                tracing::error!(tool = name, ?arguments, error = %err, "tool call failed");
                if Self::is_session_fatal(&err) {
                    Self::release_broken(&mut guard).await;
                }
                Err(err)
            }
        }
    }

    /// Fetch the prompt template for an agent.
    ///
    /// Lenient-degrade contract: a response with zero messages yields an
    /// empty string and a warning, not an error.
    pub async fn get_agent_prompt(&self, agent_id: &str) -> McpResult<String> {
        let mut guard = self.acquire().await?;
        let session = guard
            .as_ref()
            .ok_or_else(|| McpError::state("session unavailable"))?;

        let mut arguments = HashMap::new();
        arguments.insert(
            "agent_name".to_string(),
            Value::String(agent_id.to_string()),
        );

        match session.get_prompt("agentPrompt", Some(arguments)).await {
            Ok(result) => match result.messages.first() {
                Some(message) => Ok(message.content.as_text().unwrap_or_default().to_string()),
                None => {
                    tracing::warn!(agent = agent_id, "prompt returned no messages");
                    Ok(String::new())
                }
            },
            Err(err) => {
                tracing::error!(agent = agent_id, error = %err, "prompt fetch failed");
                if Self::is_session_fatal(&err) {
                    Self::release_broken(&mut guard).await;
                }
                Err(err)
            }
        }
    }

    /// Search for product recommendations from a natural-language question.
    pub async fn product_recommendations(&self, question: &str) -> McpResult<ToolOutput> {
        let mut arguments = HashMap::new();
        arguments.insert("question".to_string(), Value::String(question.to_string()));
        self.call_tool("get_product_recommendations", Some(arguments))
            .await
    }

    /// Check inventory availability for a product.
    pub async fn check_inventory(&self, product_id: &str) -> McpResult<ToolOutput> {
        let mut arguments = HashMap::new();
        arguments.insert(
            "product_id".to_string(),
            Value::String(product_id.to_string()),
        );
        self.call_tool("check_product_inventory", Some(arguments))
            .await
    }

    /// Calculate the discount for a customer from their purchase history.
    pub async fn customer_discount(&self, customer_id: &str) -> McpResult<ToolOutput> {
        let mut arguments = HashMap::new();
        arguments.insert(
            "customer_id".to_string(),
            Value::String(customer_id.to_string()),
        );
        self.call_tool("get_customer_discount", Some(arguments))
            .await
    }

    /// Generate a product image from a prompt. `size` defaults to
    /// `"1024x1024"`.
    pub async fn generate_image(
        &self,
        prompt: &str,
        size: Option<&str>,
    ) -> McpResult<ToolOutput> {
        let mut arguments = HashMap::new();
        arguments.insert("prompt".to_string(), Value::String(prompt.to_string()));
        arguments.insert(
            "size".to_string(),
            Value::String(size.unwrap_or("1024x1024").to_string()),
        );
        self.call_tool("generate_product_image", Some(arguments))
            .await
    }

    /// Close the held session (if any) and clear the tool cache. The next
    /// operation reconnects lazily.
    pub async fn cleanup(&self) {
        if let Some(session) = self.session.lock().await.take() {
            let _ = session.close().await;
        }
        self.tools.write().await.clear();
        tracing::debug!("shopper client cleaned up");
    }
}

/// Lazily constructed shopper client with exactly-once initialization.
///
/// The construction closure runs at most once across concurrent callers;
/// everyone observes the same instance afterwards.
pub struct LazyShopperClient<T: Transport + 'static = SseClientTransport> {
    cell: OnceCell<ShopperClient<T>>,
}

impl<T: Transport + 'static> LazyShopperClient<T> {
    /// An empty cell; nothing connects until first access.
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Get the client, constructing it and eagerly populating its tool
    /// cache on first access only.
    pub async fn get_or_init<F>(&self, make_client: F) -> McpResult<&ShopperClient<T>>
    where
        F: FnOnce() -> ShopperClient<T>,
    {
        self.cell
            .get_or_try_init(|| async {
                let client = make_client();
                let tools = client.list_tools().await?;
                tracing::info!(
                    url = %client.base_url(),
                    tool_count = tools.len(),
                    "shared shopper client initialized"
                );
                Ok(client)
            })
            .await
    }

    /// The client, if first access already happened.
    pub fn get_initialized(&self) -> Option<&ShopperClient<T>> {
        self.cell.get()
    }
}

impl<T: Transport + 'static> Default for LazyShopperClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

static SHARED: LazyShopperClient = LazyShopperClient::new();

/// The process-wide shared client.
///
/// The first call constructs the instance against `url` and populates its
/// tool cache; subsequent calls IGNORE `url` and return the instance built
/// by the first caller. Pass the same URL everywhere, or hold your own
/// [`ShopperClient`] instead of using the global.
pub async fn shared_client(url: &str) -> McpResult<&'static ShopperClient> {
    SHARED.get_or_init(|| ShopperClient::new(url)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{shop_responder, MockTransport, Responder};
    use shopmcp_protocol::jsonrpc::{JsonRpcIncoming, JsonRpcOutgoing};
    use std::sync::Mutex as StdMutex;

    type MethodLog = Arc<StdMutex<Vec<String>>>;

    fn mock_client() -> (ShopperClient<MockTransport>, MethodLog) {
        let log: MethodLog = Arc::new(StdMutex::new(Vec::new()));
        let factory_log = Arc::clone(&log);
        let client = ShopperClient::with_transport("mock://shop", move || {
            MockTransport::with_log(shop_responder(), Arc::clone(&factory_log))
        });
        (client, log)
    }

    fn count(log: &MethodLog, method: &str) -> usize {
        log.lock().unwrap().iter().filter(|m| *m == method).count()
    }

    #[tokio::test]
    async fn check_inventory_returns_decoded_object() {
        let (client, _log) = mock_client();
        let output = client.check_inventory("P1").await.unwrap();
        assert_eq!(
            output,
            ToolOutput::Structured(serde_json::json!({"product_id": "P1", "available": true}))
        );
    }

    #[tokio::test]
    async fn plain_text_results_stay_text() {
        let (client, _log) = mock_client();
        let output = client.customer_discount("C9").await.unwrap();
        assert_eq!(output, ToolOutput::Text("plain text discount note".into()));
    }

    #[tokio::test]
    async fn session_is_reused_across_calls() {
        let (client, log) = mock_client();
        client.check_inventory("P1").await.unwrap();
        client.check_inventory("P2").await.unwrap();
        client.customer_discount("C1").await.unwrap();

        // One handshake, three tool calls.
        assert_eq!(count(&log, "initialize"), 1);
        assert_eq!(count(&log, "tools/call"), 3);
    }

    #[tokio::test]
    async fn cleanup_forces_reconnect() {
        let (client, log) = mock_client();
        client.check_inventory("P1").await.unwrap();
        client.cleanup().await;
        assert!(client.cached_tools().await.is_empty());

        client.check_inventory("P1").await.unwrap();
        assert_eq!(count(&log, "initialize"), 2);
    }

    #[tokio::test]
    async fn agent_prompt_text_comes_from_first_message() {
        let (client, _log) = mock_client();
        let prompt = client.get_agent_prompt("cora").await.unwrap();
        assert_eq!(prompt, "You are cora.");
    }

    #[tokio::test]
    async fn agent_prompt_with_no_messages_is_empty_not_error() {
        let (client, _log) = mock_client();
        let prompt = client.get_agent_prompt("silent").await.unwrap();
        assert_eq!(prompt, "");
    }

    #[tokio::test]
    async fn llm_tools_degrades_to_empty_on_failure() {
        // Responder that fails every tools/list.
        let responder: Responder = Arc::new(|request: JsonRpcIncoming| {
            let id = request.id.clone()?;
            match request.method.as_str() {
                "initialize" => Some(JsonRpcOutgoing::success(
                    Some(id),
                    serde_json::json!({
                        "protocolVersion": shopmcp_protocol::PROTOCOL_VERSION,
                        "capabilities": {},
                        "serverInfo": {"name": "mock", "version": "0"},
                    }),
                )),
                _ => Some(JsonRpcOutgoing::error(
                    Some(id),
                    McpError::internal("listing unavailable"),
                )),
            }
        });
        let client =
            ShopperClient::with_transport("mock://shop", move || MockTransport::new(responder.clone()));

        assert!(client.llm_tools().await.is_empty());
    }

    #[tokio::test]
    async fn llm_tools_match_listing() {
        let (client, _log) = mock_client();
        let specs = client.llm_tools().await;
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].function.name, "check_product_inventory");
        assert_eq!(client.cached_tools().await.len(), 2);
    }

    #[tokio::test]
    async fn shared_instance_initializes_exactly_once() {
        let log: MethodLog = Arc::new(StdMutex::new(Vec::new()));
        let lazy: LazyShopperClient<MockTransport> = LazyShopperClient::new();

        let make = |log: MethodLog| {
            move || {
                ShopperClient::with_transport("mock://shop", move || {
                    MockTransport::with_log(shop_responder(), Arc::clone(&log))
                })
            }
        };

        let (a, b, c, d) = tokio::join!(
            lazy.get_or_init(make(Arc::clone(&log))),
            lazy.get_or_init(make(Arc::clone(&log))),
            lazy.get_or_init(make(Arc::clone(&log))),
            lazy.get_or_init(make(Arc::clone(&log))),
        );

        let a = a.unwrap();
        for other in [b.unwrap(), c.unwrap(), d.unwrap()] {
            assert!(std::ptr::eq(a, other), "all callers see the same instance");
        }
        // Exactly one populate pass: one handshake, one listing fetch.
        assert_eq!(count(&log, "initialize"), 1);
        assert_eq!(count(&log, "tools/list"), 1);
        assert_eq!(lazy.get_initialized().unwrap().cached_tools().await.len(), 2);
    }
}

//! End-to-end tests: real server on a loopback port, real SSE client.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use shopmcp_client::{ShopperClient, ToolOutput};
use shopmcp_protocol::types::Implementation;
use shopmcp_protocol::{ErrorKind, McpResult};
use shopmcp_server::prompts::{shop_prompt_registry, PromptLibrary};
use shopmcp_server::shop::{shop_tool_registry, ShopBackend};
use shopmcp_server::{http, ShopDispatch};

struct TestShop;

#[async_trait]
impl ShopBackend for TestShop {
    async fn product_recommendations(&self, question: &str) -> McpResult<Value> {
        Ok(serde_json::json!([
            {"id": "P1", "name": "Matte wall paint", "price": 24.99, "match": question},
        ]))
    }

    async fn inventory_check(&self, product_id: &str) -> McpResult<Value> {
        Ok(serde_json::json!({"product_id": product_id, "available": true}))
    }

    async fn customer_discount(&self, customer_id: &str) -> McpResult<Value> {
        Ok(serde_json::json!({"customer_id": customer_id, "discount_percentage": 15}))
    }

    async fn generate_image(&self, _prompt: &str, size: &str) -> McpResult<Value> {
        Ok(Value::String(format!("https://img.example/generated-{size}.png")))
    }
}

struct TestServer {
    url: String,
    _prompts_dir: tempfile::TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn spawn_server() -> TestServer {
    let prompts_dir = tempfile::tempdir().unwrap();
    for (file, body) in [
        ("ShopperAgentPrompt.txt", "You are Cora, a helpful shopping assistant."),
        ("CustomerLoyaltyAgentPrompt.txt", "You are the customer loyalty agent."),
        ("DiscountLogicPrompt.txt", "You compute discounts."),
        ("InteriorDesignAgentPrompt.txt", "You are an interior designer."),
        ("InventoryAgentPrompt.txt", "You answer inventory questions."),
        ("aiSearchToolPrompt.txt", "Answer using only the search result."),
    ] {
        std::fs::write(prompts_dir.path().join(file), body).unwrap();
    }

    let library = Arc::new(PromptLibrary::new(prompts_dir.path()));
    let dispatch = Arc::new(ShopDispatch::new(
        Implementation::new("shop-tools", env!("CARGO_PKG_VERSION")),
        shop_tool_registry(Arc::new(TestShop)).unwrap(),
        shop_prompt_registry(library).unwrap(),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = http::serve_with_listener(dispatch, listener, 2 * 1024 * 1024).await;
    });

    TestServer {
        url: format!("http://{addr}/sse"),
        _prompts_dir: prompts_dir,
        handle,
    }
}

#[tokio::test]
async fn discovers_the_declared_tool_surface() {
    let server = spawn_server().await;
    let client = ShopperClient::new(&server.url);

    let tools = client.list_tools().await.unwrap();
    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "get_product_recommendations",
            "check_product_inventory",
            "get_customer_discount",
            "generate_product_image",
        ]
    );

    let specs = client.llm_tools().await;
    assert_eq!(specs.len(), 4);
    for (spec, tool) in specs.iter().zip(&tools) {
        assert_eq!(spec.spec_type, "function");
        assert_eq!(spec.function.name, tool.name);
        assert_eq!(
            spec.function.parameters,
            serde_json::to_value(&tool.input_schema).unwrap()
        );
    }
}

#[tokio::test]
async fn inventory_check_round_trips_as_structured_json() {
    let server = spawn_server().await;
    let client = ShopperClient::new(&server.url);

    let output = client.check_inventory("P1").await.unwrap();
    assert_eq!(
        output,
        ToolOutput::Structured(serde_json::json!({"product_id": "P1", "available": true}))
    );
}

#[tokio::test]
async fn image_generation_returns_plain_text_url() {
    let server = spawn_server().await;
    let client = ShopperClient::new(&server.url);

    let output = client.generate_image("red sofa", None).await.unwrap();
    assert_eq!(
        output,
        ToolOutput::Text("https://img.example/generated-1024x1024.png".to_string())
    );

    let output = client.generate_image("red sofa", Some("512x512")).await.unwrap();
    assert_eq!(
        output,
        ToolOutput::Text("https://img.example/generated-512x512.png".to_string())
    );
}

#[tokio::test]
async fn unknown_tool_fails_instead_of_defaulting() {
    let server = spawn_server().await;
    let client = ShopperClient::new(&server.url);

    let err = client.call_tool("no_such_tool", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ToolNotFound);
}

#[tokio::test]
async fn agent_prompts_resolve_case_insensitively() {
    let server = spawn_server().await;
    let client = ShopperClient::new(&server.url);

    let prompt = client.get_agent_prompt("Cora").await.unwrap();
    assert_eq!(prompt, "You are Cora, a helpful shopping assistant.");
}

#[tokio::test]
async fn unknown_agent_gets_descriptive_text_without_failing() {
    let server = spawn_server().await;
    let client = ShopperClient::new(&server.url);

    let prompt = client.get_agent_prompt("unknown_agent").await.unwrap();
    assert!(prompt.contains("Unknown agent name"));
    assert!(prompt.contains("interior_designer"));
}

#[tokio::test]
async fn repeated_calls_are_idempotent() {
    let server = spawn_server().await;
    let client = ShopperClient::new(&server.url);

    let first = client.customer_discount("C42").await.unwrap();
    let second = client.customer_discount("C42").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn cleanup_then_reconnect_works() {
    let server = spawn_server().await;
    let client = ShopperClient::new(&server.url);

    client.check_inventory("P1").await.unwrap();
    client.cleanup().await;
    assert!(client.cached_tools().await.is_empty());

    // Next call opens a fresh session transparently.
    let output = client.check_inventory("P2").await.unwrap();
    assert_eq!(
        output,
        ToolOutput::Structured(serde_json::json!({"product_id": "P2", "available": true}))
    );
}

#[tokio::test]
async fn independent_clients_do_not_share_state() {
    let server = spawn_server().await;
    let a = ShopperClient::new(&server.url);
    let b = ShopperClient::new(&server.url);

    let (ra, rb) = tokio::join!(a.check_inventory("A"), b.check_inventory("B"));
    assert_eq!(
        ra.unwrap(),
        ToolOutput::Structured(serde_json::json!({"product_id": "A", "available": true}))
    );
    assert_eq!(
        rb.unwrap(),
        ToolOutput::Structured(serde_json::json!({"product_id": "B", "available": true}))
    );
}

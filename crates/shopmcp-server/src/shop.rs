//! The shopping tool surface.
//!
//! Four declared tools, each delegating to one [`ShopBackend`] collaborator
//! method. Tool names, argument names, and the `size` default are wire
//! contract. Backend return values that are not already strings are
//! serialized to a JSON string before leaving the handler.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use shopmcp_protocol::types::{Tool, ToolInputSchema};
use shopmcp_protocol::{McpError, McpResult};

use crate::registry::{optional_str, required_str, ToolHandler, ToolRegistry};

/// Default image size for `generate_product_image`.
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

/// The business logic behind the tools. Implementations live outside this
/// crate; the contract is "accept the documented arguments, return a value
/// serializable to a string or JSON document".
#[async_trait]
pub trait ShopBackend: Send + Sync + 'static {
    /// Product search over a natural-language question.
    async fn product_recommendations(&self, question: &str) -> McpResult<Value>;

    /// Inventory status for one product id.
    async fn inventory_check(&self, product_id: &str) -> McpResult<Value>;

    /// Discount available to one customer.
    async fn customer_discount(&self, customer_id: &str) -> McpResult<Value>;

    /// Generate a product image; returns a URL or path.
    async fn generate_image(&self, prompt: &str, size: &str) -> McpResult<Value>;
}

/// Serialize a backend return value: strings pass through, anything else
/// becomes its compact JSON rendering.
fn render(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn upstream(tool: &str, err: McpError) -> McpError {
    McpError::tool_execution_failed(tool, err.message)
}

fn string_property(description: &str) -> Value {
    serde_json::json!({"type": "string", "description": description})
}

/// Build the dispatch table for the shopping tool surface.
pub fn shop_tool_registry(backend: Arc<dyn ShopBackend>) -> McpResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    let tool = Tool {
        name: "get_product_recommendations".to_string(),
        description: Some("Search for product recommendations based on user query.".to_string()),
        input_schema: ToolInputSchema::object(
            [(
                "question",
                string_property(
                    "Natural language user query describing what products they're looking for",
                ),
            )],
            &["question"],
        ),
    };
    let b = Arc::clone(&backend);
    let handler: ToolHandler = Arc::new(move |arguments| {
        let b = Arc::clone(&b);
        Box::pin(async move {
            let question = required_str(&arguments, "question")?;
            let result = b
                .product_recommendations(&question)
                .await
                .map_err(|e| upstream("get_product_recommendations", e))?;
            Ok(render(result))
        })
    });
    registry.register(tool, handler)?;

    let tool = Tool {
        name: "check_product_inventory".to_string(),
        description: Some("Check inventory availability for a specific product.".to_string()),
        input_schema: ToolInputSchema::object(
            [(
                "product_id",
                string_property("The unique product ID to check inventory for"),
            )],
            &["product_id"],
        ),
    };
    let b = Arc::clone(&backend);
    let handler: ToolHandler = Arc::new(move |arguments| {
        let b = Arc::clone(&b);
        Box::pin(async move {
            let product_id = required_str(&arguments, "product_id")?;
            let result = b
                .inventory_check(&product_id)
                .await
                .map_err(|e| upstream("check_product_inventory", e))?;
            Ok(render(result))
        })
    });
    registry.register(tool, handler)?;

    let tool = Tool {
        name: "get_customer_discount".to_string(),
        description: Some(
            "Calculate available discounts for a customer based on their purchase history."
                .to_string(),
        ),
        input_schema: ToolInputSchema::object(
            [(
                "customer_id",
                string_property("The customer's unique identifier"),
            )],
            &["customer_id"],
        ),
    };
    let b = Arc::clone(&backend);
    let handler: ToolHandler = Arc::new(move |arguments| {
        let b = Arc::clone(&b);
        Box::pin(async move {
            let customer_id = required_str(&arguments, "customer_id")?;
            let result = b
                .customer_discount(&customer_id)
                .await
                .map_err(|e| upstream("get_customer_discount", e))?;
            Ok(render(result))
        })
    });
    registry.register(tool, handler)?;

    let tool = Tool {
        name: "generate_product_image".to_string(),
        description: Some("Generate an AI image based on a text description.".to_string()),
        input_schema: ToolInputSchema::object(
            [
                (
                    "prompt",
                    string_property("Detailed description of the image to generate"),
                ),
                (
                    "size",
                    serde_json::json!({
                        "type": "string",
                        "description": "Image size (e.g. '1024x1024')",
                        "default": DEFAULT_IMAGE_SIZE,
                    }),
                ),
            ],
            &["prompt"],
        ),
    };
    let b = Arc::clone(&backend);
    let handler: ToolHandler = Arc::new(move |arguments| {
        let b = Arc::clone(&b);
        Box::pin(async move {
            let prompt = required_str(&arguments, "prompt")?;
            let size = optional_str(&arguments, "size", DEFAULT_IMAGE_SIZE);
            let result = b
                .generate_image(&prompt, &size)
                .await
                .map_err(|e| upstream("generate_product_image", e))?;
            Ok(render(result))
        })
    });
    registry.register(tool, handler)?;

    Ok(registry)
}

//! # shopmcp-server
//!
//! Server side of the shopmcp tool/prompt broker.
//!
//! - [`registry`]: explicit, inspectable dispatch tables (tool name to
//!   handler, prompt name to handler) built at startup, with duplicate
//!   registration rejected so every declared name has exactly one handler
//! - [`shop`]: the shopping tool surface (`get_product_recommendations`,
//!   `check_product_inventory`, `get_customer_discount`,
//!   `generate_product_image`) over the [`ShopBackend`] collaborator trait
//! - [`prompts`]: the prompt surface (`agentPrompt`, `aiSearchToolPrompt`)
//!   over a template-file library
//! - [`router`]: JSON-RPC method dispatch (`initialize`, `tools/*`,
//!   `prompts/*`)
//! - [`http`]: the axum transport; `GET /sse` streams, `POST
//!   /messages/{session_id}` submits
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shopmcp_server::{http, prompts, shop, ServerConfig, ShopDispatch};
//! # use shopmcp_protocol::{McpResult, types::Implementation};
//! # async fn example(backend: Arc<dyn shop::ShopBackend>) -> McpResult<()> {
//! let config = ServerConfig::default();
//! let library = Arc::new(prompts::PromptLibrary::new(&config.prompts_dir));
//! let dispatch = ShopDispatch::new(
//!     Implementation::new("shop-tools", "0.3.0"),
//!     shop::shop_tool_registry(backend)?,
//!     prompts::shop_prompt_registry(library)?,
//! );
//! http::serve(Arc::new(dispatch), &config).await
//! # }
//! ```

pub mod config;
pub mod http;
pub mod prompts;
pub mod registry;
pub mod router;
pub mod shop;

pub use config::ServerConfig;
pub use registry::{PromptRegistry, ToolRegistry};
pub use router::{route_request, ShopDispatch};
pub use shop::ShopBackend;

//! # shopmcp-client
//!
//! Client side of the shopmcp tool/prompt broker.
//!
//! Layering, bottom up:
//!
//! - [`dispatcher`]: single consumer of the transport's inbound stream,
//!   routing responses to waiting calls by request id
//! - [`protocol`]: JSON-RPC request/response with id generation, timeout,
//!   and wire-error mapping
//! - [`session`]: the protocol session state machine (`initialize` exactly
//!   once, then `tools/list` / `tools/call` / `prompts/get`, then `close`)
//! - [`llm`]: adapts tool descriptors into the function-spec format a
//!   language-model tool-calling interface consumes
//! - [`decode`]: normalizes tool-call responses into a tagged
//!   [`ToolOutput`] (structured JSON or plain text)
//! - [`shopper`]: the public facade with fixed-name convenience wrappers
//!   for the shopping tool surface, session reuse, and the process-wide
//!   shared instance
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use shopmcp_client::ShopperClient;
//!
//! # async fn example() -> shopmcp_protocol::McpResult<()> {
//! let client = ShopperClient::new("http://localhost:8000/sse");
//! let inventory = client.check_inventory("P1").await?;
//! println!("{:?}", inventory);
//! # Ok(())
//! # }
//! ```

mod dispatcher;
mod protocol;
#[cfg(test)]
pub(crate) mod testing;

pub mod decode;
pub mod llm;
pub mod session;
pub mod shopper;

pub use decode::{decode, ToolOutput};
pub use llm::{to_llm_format, FunctionSpec};
pub use session::Session;
pub use shopper::{shared_client, LazyShopperClient, ShopperClient, DEFAULT_SERVER_URL};

//! shopmcp demo binary.
//!
//! `serve` runs the shop broker over the in-memory backend; the remaining
//! subcommands exercise it as a client.

mod memory_shop;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memory_shop::MemoryShop;
use shopmcp_client::{ShopperClient, DEFAULT_SERVER_URL};
use shopmcp_protocol::types::Implementation;
use shopmcp_server::config::DEFAULT_BIND_ADDR;
use shopmcp_server::prompts::{shop_prompt_registry, PromptLibrary};
use shopmcp_server::shop::shop_tool_registry;
use shopmcp_server::{http, ServerConfig, ShopDispatch};

#[derive(Parser)]
#[command(name = "shopmcp-demo", version, about = "Shopping tool broker demo")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the shop server over the in-memory backend
    Serve {
        /// Address to bind
        #[arg(long, default_value = DEFAULT_BIND_ADDR, env = "SHOPMCP_BIND")]
        bind: String,
        /// Directory holding the prompt template files
        #[arg(long, default_value = "demo/prompts", env = "SHOPMCP_PROMPTS_DIR")]
        prompts_dir: PathBuf,
    },
    /// List the server's declared tools
    Tools {
        /// SSE endpoint of the server
        #[arg(long, default_value = DEFAULT_SERVER_URL, env = "SHOPMCP_URL")]
        url: String,
    },
    /// Invoke one tool by name with JSON arguments
    Call {
        /// SSE endpoint of the server
        #[arg(long, default_value = DEFAULT_SERVER_URL, env = "SHOPMCP_URL")]
        url: String,
        /// Tool name, e.g. check_product_inventory
        name: String,
        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,
    },
    /// Fetch the prompt template for an agent
    Prompt {
        /// SSE endpoint of the server
        #[arg(long, default_value = DEFAULT_SERVER_URL, env = "SHOPMCP_URL")]
        url: String,
        /// Agent name, e.g. cora
        agent: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Serve { bind, prompts_dir } => {
            let config = ServerConfig {
                bind_addr: bind,
                prompts_dir,
                ..ServerConfig::default()
            };
            let library = Arc::new(PromptLibrary::new(&config.prompts_dir));
            let dispatch = Arc::new(ShopDispatch::new(
                Implementation::new("shop-tools", env!("CARGO_PKG_VERSION")),
                shop_tool_registry(Arc::new(MemoryShop::new()))?,
                shop_prompt_registry(library)?,
            ));
            http::serve(dispatch, &config).await?;
        }
        Command::Tools { url } => {
            let client = ShopperClient::new(url);
            for tool in client.list_tools().await? {
                println!(
                    "{:32}  {}",
                    tool.name,
                    tool.description.as_deref().unwrap_or("(no description)")
                );
            }
        }
        Command::Call {
            url,
            name,
            arguments,
        } => {
            let arguments: HashMap<String, serde_json::Value> =
                serde_json::from_str(&arguments).context("arguments must be a JSON object")?;
            let client = ShopperClient::new(url);
            let output = client.call_tool(&name, Some(arguments)).await?;
            println!("{output}");
        }
        Command::Prompt { url, agent } => {
            let client = ShopperClient::new(url);
            println!("{}", client.get_agent_prompt(&agent).await?);
        }
    }

    Ok(())
}

//! Dispatch registries.
//!
//! The dispatch tables are built explicitly at startup: an ordered list of
//! declarations plus a name index. Registration rejects duplicate names, so
//! a fully constructed registry is known to bind every declared name to
//! exactly one handler. Lookup failures are typed: unknown tool names fail
//! with `ToolNotFound`, unknown prompt names with `PromptNotFound`.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use shopmcp_protocol::types::{CallToolResult, GetPromptResult, Prompt, Tool};
use shopmcp_protocol::{McpError, McpResult};

/// Tool handler: named arguments in, serialized text payload out.
pub type ToolHandler =
    Arc<dyn Fn(HashMap<String, Value>) -> BoxFuture<'static, McpResult<String>> + Send + Sync>;

/// Prompt handler: template arguments in, rendered message envelope out.
pub type PromptHandler = Arc<
    dyn Fn(HashMap<String, Value>) -> BoxFuture<'static, McpResult<GetPromptResult>> + Send + Sync,
>;

/// Tool name to handler, declaration order preserved.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<(Tool, ToolHandler)>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a tool declaration to its handler. A name may be registered
    /// only once.
    pub fn register(&mut self, tool: Tool, handler: ToolHandler) -> McpResult<()> {
        if self.index.contains_key(&tool.name) {
            return Err(McpError::configuration(format!(
                "duplicate tool registration: {}",
                tool.name
            )));
        }
        self.index.insert(tool.name.clone(), self.entries.len());
        self.entries.push((tool, handler));
        Ok(())
    }

    /// The declared tools, in registration order.
    pub fn list(&self) -> Vec<Tool> {
        self.entries.iter().map(|(tool, _)| tool.clone()).collect()
    }

    /// Number of declared tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tools are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `name` and run its handler.
    pub async fn call(
        &self,
        name: &str,
        arguments: HashMap<String, Value>,
    ) -> McpResult<CallToolResult> {
        let Some(&position) = self.index.get(name) else {
            tracing::warn!(tool = name, "call for undeclared tool");
            return Err(McpError::tool_not_found(name));
        };
        let (_, handler) = &self.entries[position];

        let text = handler(arguments).await.map_err(|err| {
            tracing::error!(tool = name, error = %err, "tool handler failed");
            err
        })?;
        Ok(CallToolResult::text(text))
    }
}

/// Prompt name to handler, declaration order preserved.
#[derive(Default)]
pub struct PromptRegistry {
    entries: Vec<(Prompt, PromptHandler)>,
    index: HashMap<String, usize>,
}

impl PromptRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a prompt declaration to its handler. A name may be registered
    /// only once.
    pub fn register(&mut self, prompt: Prompt, handler: PromptHandler) -> McpResult<()> {
        if self.index.contains_key(&prompt.name) {
            return Err(McpError::configuration(format!(
                "duplicate prompt registration: {}",
                prompt.name
            )));
        }
        self.index.insert(prompt.name.clone(), self.entries.len());
        self.entries.push((prompt, handler));
        Ok(())
    }

    /// The declared prompts, in registration order.
    pub fn list(&self) -> Vec<Prompt> {
        self.entries
            .iter()
            .map(|(prompt, _)| prompt.clone())
            .collect()
    }

    /// Resolve `name` and render it with `arguments`.
    pub async fn get(
        &self,
        name: &str,
        arguments: HashMap<String, Value>,
    ) -> McpResult<GetPromptResult> {
        let Some(&position) = self.index.get(name) else {
            tracing::warn!(prompt = name, "request for undeclared prompt");
            return Err(McpError::prompt_not_found(name));
        };
        let (_, handler) = &self.entries[position];

        handler(arguments).await.map_err(|err| {
            tracing::error!(prompt = name, error = %err, "prompt handler failed");
            err
        })
    }
}

/// Extract a required string argument.
pub(crate) fn required_str(arguments: &HashMap<String, Value>, key: &str) -> McpResult<String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| McpError::invalid_params(format!("missing required string argument '{key}'")))
}

/// Extract an optional string argument, falling back to `default`.
pub(crate) fn optional_str(
    arguments: &HashMap<String, Value>,
    key: &str,
    default: &str,
) -> String {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

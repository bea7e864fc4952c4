//! Tool-schema adapter for language-model tool calling.
//!
//! Converts the broker's tool descriptors into the function-spec format a
//! chat-completion style API consumes. The transform is pure, total, and
//! order-preserving; name, description, and input schema pass through
//! verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use shopmcp_protocol::Tool;

/// One function specification in LLM tool-calling format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Always `"function"`
    #[serde(rename = "type")]
    pub spec_type: String,
    /// The function declaration
    pub function: FunctionDef,
}

/// Function declaration: name, description, and parameter schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Tool name, verbatim
    pub name: String,
    /// Tool description, verbatim (empty when the tool declares none)
    pub description: String,
    /// The tool's input schema, verbatim
    pub parameters: Value,
}

/// Convert tool descriptors to function specs, one per tool, preserving
/// order.
pub fn to_llm_format(tools: &[Tool]) -> Vec<FunctionSpec> {
    tools
        .iter()
        .map(|tool| FunctionSpec {
            spec_type: "function".to_string(),
            function: FunctionDef {
                name: tool.name.clone(),
                description: tool.description.clone().unwrap_or_default(),
                parameters: serde_json::to_value(&tool.input_schema)
                    .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
            },
        })
        .collect()
}

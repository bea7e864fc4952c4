//! The prompt surface.
//!
//! Prompt templates live as plain text files in a directory; the registry
//! declares two prompts over them:
//!
//! - `agentPrompt`: maps a logical agent name (case-insensitive) to its
//!   template file. Unknown agent names resolve to a descriptive string,
//!   not an error; prompt resolution at this level never fails on name.
//! - `aiSearchToolPrompt`: substitutes a search result and a question into
//!   a fixed template.
//!
//! Contrast with tools: an unknown *prompt* name (registry level) is still
//! a hard [`PromptNotFound`] error, as is a missing template file.
//!
//! [`PromptNotFound`]: shopmcp_protocol::ErrorKind::PromptNotFound

use std::path::PathBuf;
use std::sync::Arc;

use shopmcp_protocol::types::{GetPromptResult, Prompt, PromptArgument, PromptMessage};
use shopmcp_protocol::{McpError, McpResult};

use crate::registry::{required_str, PromptHandler, PromptRegistry};

/// Logical agent name to template file.
const AGENT_PROMPT_FILES: &[(&str, &str)] = &[
    ("cora", "ShopperAgentPrompt.txt"),
    ("customer_loyalty", "CustomerLoyaltyAgentPrompt.txt"),
    ("discount_logic", "DiscountLogicPrompt.txt"),
    ("interior_designer", "InteriorDesignAgentPrompt.txt"),
    ("inventory", "InventoryAgentPrompt.txt"),
];

/// Template file behind `aiSearchToolPrompt`.
const AI_SEARCH_TOOL_PROMPT_FILE: &str = "aiSearchToolPrompt.txt";

/// Template-file store addressed by logical filename.
pub struct PromptLibrary {
    dir: PathBuf,
}

impl PromptLibrary {
    /// Library over the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read one template file.
    pub fn read(&self, filename: &str) -> McpResult<String> {
        let path = self.dir.join(filename);
        std::fs::read_to_string(&path).map_err(|e| {
            McpError::internal(format!(
                "failed to read prompt file '{}': {e}",
                path.display()
            ))
        })
    }
}

/// Resolve an agent name to its prompt text.
///
/// Matching is case-insensitive. Unrecognized names return a descriptive
/// string naming the valid options; this path never fails on the name
/// itself.
pub fn agent_prompt(library: &PromptLibrary, agent_name: &str) -> McpResult<String> {
    let key = agent_name.to_lowercase();
    match AGENT_PROMPT_FILES.iter().find(|(name, _)| *name == key) {
        Some((_, filename)) => library.read(filename),
        None => {
            tracing::warn!(agent = agent_name, "unknown agent name requested");
            let valid = AGENT_PROMPT_FILES
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", ");
            Ok(format!(
                "Unknown agent name: {agent_name}. Valid options are: {valid}"
            ))
        }
    }
}

/// Render the AI-search prompt: the template followed by the two named
/// fields.
pub fn ai_search_tool_prompt(
    library: &PromptLibrary,
    srch_result: &str,
    question: &str,
) -> McpResult<String> {
    let template = library.read(AI_SEARCH_TOOL_PROMPT_FILE)?;
    Ok(format!(
        "{template}\n\nsrch_explanation: {srch_result}\nquestion: {question}"
    ))
}

/// Build the dispatch table for the prompt surface.
pub fn shop_prompt_registry(library: Arc<PromptLibrary>) -> McpResult<PromptRegistry> {
    let mut registry = PromptRegistry::new();

    let prompt = Prompt {
        name: "agentPrompt".to_string(),
        title: Some("Agent Prompt".to_string()),
        description: Some(
            "Returns the appropriate agent prompt based on the agent name.".to_string(),
        ),
        arguments: Some(vec![PromptArgument::required(
            "agent_name",
            "One of 'cora', 'customer_loyalty', 'discount_logic', 'interior_designer', or 'inventory'",
        )]),
    };
    let lib = Arc::clone(&library);
    let handler: PromptHandler = Arc::new(move |arguments| {
        let lib = Arc::clone(&lib);
        Box::pin(async move {
            let agent_name = required_str(&arguments, "agent_name")?;
            let text = agent_prompt(&lib, &agent_name)?;
            Ok(GetPromptResult {
                description: Some("Agent Prompt".to_string()),
                messages: vec![PromptMessage::user_text(text)],
            })
        })
    });
    registry.register(prompt, handler)?;

    let prompt = Prompt {
        name: "aiSearchToolPrompt".to_string(),
        title: Some("AI Search Tool Prompt".to_string()),
        description: None,
        arguments: Some(vec![
            PromptArgument::required("srch_result", "Search result explanation to ground on"),
            PromptArgument::required("question", "The user's question"),
        ]),
    };
    let lib = Arc::clone(&library);
    let handler: PromptHandler = Arc::new(move |arguments| {
        let lib = Arc::clone(&lib);
        Box::pin(async move {
            let srch_result = required_str(&arguments, "srch_result")?;
            let question = required_str(&arguments, "question")?;
            let text = ai_search_tool_prompt(&lib, &srch_result, &question)?;
            Ok(GetPromptResult {
                description: Some("AI Search Tool Prompt".to_string()),
                messages: vec![PromptMessage::user_text(text)],
            })
        })
    });
    registry.register(prompt, handler)?;

    Ok(registry)
}

//! Tool-call result decoding.
//!
//! Tools return either structured JSON serialized into a text block or
//! plain prose; both are first-class. The decoder takes the first textual
//! content block (or, lacking any, the JSON rendering of the whole
//! envelope) and opportunistically parses it: JSON parse success wins,
//! anything else stays text. Decoding never fails.

use serde_json::Value;

use shopmcp_protocol::CallToolResult;

/// Decoded tool output, tagged so consumers pattern-match instead of
/// guessing the shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// The payload parsed as JSON
    Structured(Value),
    /// The payload as plain text
    Text(String),
}

impl ToolOutput {
    /// The structured value, if this output parsed as JSON.
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// The raw text, if this output did not parse as JSON.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Structured(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    /// Collapse into a JSON value; text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            Self::Structured(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

impl std::fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Decode a tool-call response envelope.
pub fn decode(result: &CallToolResult) -> ToolOutput {
    let raw = match result.content.iter().find_map(|block| block.as_text()) {
        Some(text) => text.to_string(),
        // No textual block at all: fall back to the envelope itself.
        None => serde_json::to_string(result).unwrap_or_default(),
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => ToolOutput::Structured(value),
        Err(_) => ToolOutput::Text(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shopmcp_protocol::types::{ContentBlock, ImageContent};

    #[test]
    fn json_object_decodes_as_structured() {
        let result = CallToolResult::text(r#"{"product_id":"P1","available":true}"#);
        let output = decode(&result);
        assert_eq!(
            output,
            ToolOutput::Structured(serde_json::json!({"product_id": "P1", "available": true}))
        );
    }

    #[test]
    fn bare_number_parses_as_json_not_text() {
        let output = decode(&CallToolResult::text("42"));
        assert_eq!(output, ToolOutput::Structured(serde_json::json!(42)));
    }

    #[test]
    fn prose_stays_text() {
        let output = decode(&CallToolResult::text("hello world"));
        assert_eq!(output, ToolOutput::Text("hello world".to_string()));
    }

    #[test]
    fn first_textual_block_wins() {
        let result = CallToolResult {
            content: vec![
                ContentBlock::Image(ImageContent {
                    data: "aGk=".into(),
                    mime_type: "image/png".into(),
                }),
                ContentBlock::text("\"second\""),
                ContentBlock::text("\"third\""),
            ],
            is_error: None,
        };
        let output = decode(&result);
        assert_eq!(output, ToolOutput::Structured(serde_json::json!("second")));
    }

    #[test]
    fn empty_content_falls_back_to_envelope() {
        let result = CallToolResult {
            content: vec![],
            is_error: Some(false),
        };
        let output = decode(&result);
        // The envelope renders as JSON, so the fallback is structured.
        let value = output.as_structured().expect("envelope should parse");
        assert_eq!(value["isError"], false);
    }

    #[test]
    fn into_value_wraps_text_as_string() {
        let output = ToolOutput::Text("plain".into());
        assert_eq!(output.into_value(), serde_json::json!("plain"));
    }
}

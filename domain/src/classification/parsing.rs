//! Structured-output contract for LLM classification.
//!
//! The schema is sent alongside the classification prompt; the reply is
//! accepted either as a fenced ```` ```json ```` block or as a bare JSON
//! object somewhere in the text.

use super::entities::QueryClassification;
use serde_json::{Value, json};

/// JSON schema describing a [`QueryClassification`].
pub fn classification_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": {
                "type": "string",
                "enum": ["simple", "complex", "tool_confirmation"]
            },
            "category": {
                "type": "string",
                "enum": ["general", "admin", "code", "research", "github"]
            },
            "complexity": {
                "type": "string",
                "enum": ["low", "medium", "high"]
            },
            "requires_human_approval": { "type": "boolean" },
            "reasoning": { "type": "string" }
        },
        "required": ["type", "category", "complexity", "requires_human_approval"]
    })
}

/// Instructions sent as the system message of a classification call.
pub fn classification_instructions() -> String {
    format!(
        "Classify the user's message for an assistant router. \
         Reply with a single JSON object matching this schema and nothing else:\n{}",
        classification_schema()
    )
}

/// Parse a classification out of model output, or `None` if malformed.
pub fn parse_classification_response(response: &str) -> Option<QueryClassification> {
    let candidate = extract_json_object(response)?;
    serde_json::from_str::<QueryClassification>(candidate).ok()
}

/// Locate the JSON object in an LLM reply.
///
/// Prefers a ```` ```json ```` fence; otherwise takes the span from the
/// first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

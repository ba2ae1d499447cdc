//! Normalization of upstream response bodies into answer text and citations.

use crate::proxy::types::Citation;
use serde_json::{Map, Value};

/// Returned instead of an empty string when no text leaf was found.
pub const NO_TEXT_OUTPUT: &str = "(no text output)";

const TEXT_NODE_TYPES: [&str; 2] = ["output_text", "text"];

/// Answer text and citations pulled from one upstream reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAnswer {
    /// Text leaves joined by newlines, or [`NO_TEXT_OUTPUT`].
    pub text: String,
    /// File citations in document order, deduplicated.
    pub citations: Vec<Citation>,
}

/// Walk the reply depth-first, collecting text leaves and file citations in document order.
pub fn normalize_response(response: &Value) -> NormalizedAnswer {
    let mut texts = Vec::new();
    let mut citations = Vec::new();
    walk(response, &mut texts, &mut citations);

    let mut text = texts.join("\n").trim().to_string();
    if text.is_empty() {
        if let Some(convenience) = response.get("output_text").and_then(Value::as_str) {
            text = convenience.trim().to_string();
        }
    }
    if text.is_empty() {
        text = NO_TEXT_OUTPUT.to_string();
    }

    NormalizedAnswer { text, citations }
}

fn walk(value: &Value, texts: &mut Vec<String>, citations: &mut Vec<Citation>) {
    match value {
        Value::Array(items) => {
            for item in items {
                walk(item, texts, citations);
            }
        }
        Value::Object(map) => {
            match map.get("type").and_then(Value::as_str) {
                Some(kind) if TEXT_NODE_TYPES.contains(&kind) => {
                    if let Some(text) = text_leaf(map.get("text")) {
                        texts.push(text.to_string());
                    }
                }
                Some("file_citation") => {
                    if let Some(citation) = citation_from(map) {
                        if !citations.contains(&citation) {
                            citations.push(citation);
                        }
                    }
                }
                _ => {}
            }
            // Plain string children are leaves; nested text objects still carry annotations.
            for child in map.values() {
                walk(child, texts, citations);
            }
        }
        _ => {}
    }
}

/// Text may be a bare string or an object carrying a `value` string.
fn text_leaf(value: Option<&Value>) -> Option<&str> {
    let text = match value? {
        Value::String(text) => text.as_str(),
        Value::Object(inner) => inner.get("value").and_then(Value::as_str)?,
        _ => return None,
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn citation_from(map: &Map<String, Value>) -> Option<Citation> {
    let nested = map.get("file_citation").and_then(Value::as_object);
    let lookup = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .or_else(|| nested.and_then(|inner| inner.get(key)).and_then(Value::as_str))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    Some(Citation {
        file_id: lookup("file_id")?,
        filename: lookup("filename"),
        quote: lookup("quote"),
    })
}

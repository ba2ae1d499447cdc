//! Search payload shapes and the classifier deciding when to fall back to the next one.
//!
//! The upstream has moved the "restrict file search to this store" setting around between API
//! versions. Each [`PayloadVariant`] places the store id in one of the known locations; the
//! query flow tries them in order and only moves on when the upstream rejects the shape itself.

use crate::upstream::UpstreamError;
use reqwest::StatusCode;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::fmt;

/// Fields whose placement differs across variants.
const SHAPE_FIELDS: [&str; 3] = ["tool_resources", "file_search", "vector_store_ids"];

/// Error codes the upstream uses for a misplaced or unrecognized field.
const SHAPE_CODES: [&str; 4] = [
    "unknown_parameter",
    "unsupported_parameter",
    "missing_required_parameter",
    "invalid_type",
];

/// Message fragments the upstream uses for a misplaced or unrecognized field.
const SHAPE_PHRASES: [&str; 5] = [
    "unknown parameter",
    "unrecognized request argument",
    "unsupported parameter",
    "missing required parameter",
    "additional properties",
];

/// One request-shape template for the response-generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadVariant {
    /// Store id under top-level `tool_resources.file_search.vector_store_ids`.
    ToolResources,
    /// Store id under `tools[0].file_search.vector_store_ids`.
    NestedFileSearch,
    /// Store id directly on the tool as `tools[0].vector_store_ids`.
    FlatFileSearch,
}

/// Inputs shared by every variant.
#[derive(Debug, Clone, Copy)]
pub struct QueryPayload<'a> {
    /// Model name.
    pub model: &'a str,
    /// Query text sent as the user message.
    pub query: &'a str,
    /// Vector store to search.
    pub store_id: &'a str,
    /// Advisory result count, forwarded as metadata.
    pub top_k: u32,
    /// Advisory namespace, forwarded as metadata.
    pub namespace: Option<&'a str>,
}

impl PayloadVariant {
    /// Fallback order used when none is configured: most structured first, flattest last.
    pub const DEFAULT_ORDER: [PayloadVariant; 3] = [
        PayloadVariant::ToolResources,
        PayloadVariant::NestedFileSearch,
        PayloadVariant::FlatFileSearch,
    ];

    /// Stable name used in configuration and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::ToolResources => "tool_resources",
            Self::NestedFileSearch => "nested_file_search",
            Self::FlatFileSearch => "flat_file_search",
        }
    }

    /// Render the upstream request body for this shape.
    pub fn build(self, params: &QueryPayload<'_>) -> Value {
        let store_ids = json!([params.store_id]);
        let mut tool = Map::new();
        tool.insert("type".into(), Value::from("file_search"));

        let mut body = Map::new();
        body.insert("model".into(), Value::from(params.model));
        body.insert(
            "input".into(),
            json!([{
                "role": "user",
                "content": [{ "type": "input_text", "text": params.query }]
            }]),
        );

        match self {
            Self::ToolResources => {
                body.insert("tools".into(), Value::Array(vec![Value::Object(tool)]));
                body.insert(
                    "tool_resources".into(),
                    json!({ "file_search": { "vector_store_ids": store_ids } }),
                );
            }
            Self::NestedFileSearch => {
                tool.insert(
                    "file_search".into(),
                    json!({ "vector_store_ids": store_ids }),
                );
                body.insert("tools".into(), Value::Array(vec![Value::Object(tool)]));
            }
            Self::FlatFileSearch => {
                tool.insert("vector_store_ids".into(), store_ids);
                body.insert("tools".into(), Value::Array(vec![Value::Object(tool)]));
            }
        }

        let mut metadata = Map::new();
        metadata.insert("origin".into(), Value::from("vecproxy"));
        metadata.insert("top_k".into(), Value::from(params.top_k.to_string()));
        if let Some(namespace) = params.namespace {
            metadata.insert("namespace".into(), Value::from(namespace));
        }
        body.insert("metadata".into(), Value::Object(metadata));

        Value::Object(body)
    }
}

impl fmt::Display for PayloadVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for PayloadVariant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl std::str::FromStr for PayloadVariant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "tool_resources" => Ok(Self::ToolResources),
            "nested_file_search" | "nested" => Ok(Self::NestedFileSearch),
            "flat_file_search" | "flat" => Ok(Self::FlatFileSearch),
            _ => Err(()),
        }
    }
}

/// Whether an upstream failure means "this request shape is not accepted".
///
/// Requires a 400 whose error names one of the store-placement fields and describes it as
/// unknown, unsupported, or missing. Auth, quota, and model errors never qualify.
pub fn is_shape_rejection(error: &UpstreamError) -> bool {
    let UpstreamError::UnexpectedStatus { status, body } = error else {
        return false;
    };
    if *status != StatusCode::BAD_REQUEST {
        return false;
    }

    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let detail = parsed.get("error").unwrap_or(&parsed);
    let field = |key: &str| {
        detail
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    };
    let message = match detail.get("message").and_then(Value::as_str) {
        Some(message) => message.to_lowercase(),
        None => body.to_lowercase(),
    };
    let code = field("code");
    let param = field("param");

    let rejects_parameter = SHAPE_CODES.iter().any(|known| code == *known)
        || SHAPE_PHRASES.iter().any(|phrase| message.contains(phrase));
    let names_shape_field = SHAPE_FIELDS
        .iter()
        .any(|name| param.contains(name) || message.contains(name));

    rejects_parameter && names_shape_field
}

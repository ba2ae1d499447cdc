//! Request, outcome, and error types shared by the ingest and query flows.

use crate::proxy::PayloadVariant;
use crate::upstream::{FileUpload, UpstreamError};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Advisory result count used when the caller does not send `top_k`.
pub const DEFAULT_TOP_K: u32 = 6;

/// Flow step an upstream failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// File creation.
    Upload,
    /// Attaching the file to the vector store.
    Attach,
    /// Response generation.
    Search,
}

impl Stage {
    /// Wire name used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Attach => "attach",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller input rejected before any upstream call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// `query` was absent, not a string, or blank.
    #[error("query required")]
    MissingQuery,
    /// Multipart upload carried no `file` part.
    #[error("file required")]
    MissingFile,
    /// A field was present with an unusable value.
    #[error("{field} {reason}")]
    InvalidField {
        /// Offending field name.
        field: &'static str,
        /// Human-readable constraint.
        reason: &'static str,
    },
    /// Body could not be decoded at all.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    /// Body exceeded the configured size limit.
    #[error("request body too large")]
    PayloadTooLarge,
}

/// Outcome of one rejected payload variant.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VariantDiagnostic {
    /// Variant that was attempted.
    pub variant: PayloadVariant,
    /// Upstream HTTP status, absent for transport failures.
    pub upstream_status: Option<u16>,
    /// Upstream body (JSON when parseable) or transport error text.
    pub error: Value,
    /// Whether the failure was classified as a request-shape rejection.
    pub shape_rejection: bool,
}

/// Errors surfaced by the ingest and query flows.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A single upstream call failed at the given stage.
    #[error("{stage} failed: {source}")]
    Upstream {
        /// Stage that failed.
        stage: Stage,
        /// Underlying upstream failure.
        #[source]
        source: UpstreamError,
    },
    /// Every attempted search variant failed, or a non-shape error stopped the fallback.
    #[error("search failed after {} attempt(s)", .0.len())]
    SearchFailed(Vec<VariantDiagnostic>),
}

/// Validated `/search` input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Non-empty query text.
    pub query: String,
    /// Advisory result count; forwarded as metadata only.
    pub top_k: u32,
    /// Advisory namespace hint.
    pub namespace: Option<String>,
}

impl SearchRequest {
    /// Build a request, trimming the query and dropping a blank namespace.
    pub fn new(
        query: impl Into<String>,
        top_k: Option<u32>,
        namespace: Option<String>,
    ) -> Result<Self, ValidationError> {
        let query = query.into().trim().to_string();
        if query.is_empty() {
            return Err(ValidationError::MissingQuery);
        }
        Ok(Self {
            query,
            top_k: top_k.unwrap_or(DEFAULT_TOP_K),
            namespace: sanitize_namespace(namespace),
        })
    }
}

/// Validated `/upload` input.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// File forwarded to the upstream.
    pub file: FileUpload,
    /// Optional namespace tag applied after attaching.
    pub namespace: Option<String>,
}

/// Successful ingest summary.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// Upstream file id.
    pub file_id: String,
    /// Store the file was attached to.
    pub vector_store_id: String,
    /// Namespace requested by the caller.
    pub namespace: Option<String>,
    /// Attachment record as returned by the upstream.
    pub attach: Value,
    /// Whether namespace tagging succeeded; `false` when skipped or failed.
    pub namespace_tagged: bool,
}

/// File reference extracted from an answer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Citation {
    /// Upstream file id.
    pub file_id: String,
    /// File name when the upstream reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Quoted snippet when the upstream reported one.
    pub quote: Option<String>,
}

/// Successful search summary.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Normalized answer text, or the no-text sentinel.
    pub text: String,
    /// Best-effort citations in document order.
    pub citations: Vec<Citation>,
    /// Variant the upstream accepted.
    pub variant: PayloadVariant,
    /// Variants rejected before the accepted one.
    pub attempts: Vec<VariantDiagnostic>,
    /// Upstream response id, when present.
    pub response_id: Option<String>,
}

/// Trim a namespace and treat blanks as absent.
pub fn sanitize_namespace(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

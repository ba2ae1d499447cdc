//! Shared types used by the upstream client and its callers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors returned while interacting with the upstream document-search API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
    /// Request never produced a response: connect failure, timeout, or broken body.
    #[error("Upstream transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// Upstream answered with a non-2xx status.
    #[error("Unexpected upstream response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the upstream.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Upstream answered 2xx but the body lacked a field we rely on.
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),
}

impl UpstreamError {
    /// HTTP status reported by the upstream, when it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the upstream was unreachable rather than rejecting the call.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Diagnostic payload for callers: the upstream body as JSON when it parses, otherwise text.
    pub fn detail(&self) -> Value {
        match self {
            Self::UnexpectedStatus { body, .. } => serde_json::from_str(body)
                .unwrap_or_else(|_| Value::String(body.clone())),
            other => Value::String(other.to_string()),
        }
    }
}

/// Binary payload forwarded to the file-create endpoint.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Raw file bytes.
    pub bytes: Vec<u8>,
    /// File name reported to the upstream.
    pub filename: String,
    /// MIME type of the payload.
    pub content_type: String,
}

/// Vector store summary returned by list and create calls.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VectorStore {
    /// Upstream identifier.
    pub id: String,
    /// Display name, which the upstream does not require to be unique.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ListVectorStoresResponse {
    #[serde(default)]
    pub(crate) data: Vec<VectorStore>,
    #[serde(default)]
    pub(crate) has_more: bool,
    #[serde(default)]
    pub(crate) last_id: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct FileObject {
    pub(crate) id: String,
}

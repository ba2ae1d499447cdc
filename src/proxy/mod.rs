//! Ingest and query flows layered over the upstream client.

pub mod extract;
mod ingest;
mod query;
mod service;
pub mod types;
pub mod variants;

pub use extract::{NO_TEXT_OUTPUT, NormalizedAnswer, normalize_response};
pub use ingest::ingest;
pub use query::search_with_fallback;
pub use service::{ProxyApi, ProxyService};
pub use types::{
    Citation, DEFAULT_TOP_K, ProxyError, SearchOutcome, SearchRequest, Stage, UploadOutcome,
    UploadRequest, ValidationError, VariantDiagnostic,
};
pub use variants::{PayloadVariant, QueryPayload, is_shape_rejection};

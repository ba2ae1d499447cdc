//! Upstream document-search provider integration.

pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

pub use client::{UpstreamApi, UpstreamClient};
pub use types::{FileUpload, UpstreamError, VectorStore};

//! Proxy service tying configuration, the upstream client, and the resolved store together.

use crate::{
    config::Config,
    proxy::{
        ingest::ingest,
        query::search_with_fallback,
        types::{ProxyError, SearchOutcome, SearchRequest, UploadOutcome, UploadRequest},
    },
    resolver::{VectorStoreHandle, resolve_vector_store},
    upstream::{UpstreamApi, UpstreamError},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Owns the upstream client and the store resolved at startup.
///
/// Build it once near process start and share it through an `Arc`; nothing in it changes
/// after construction, so request handlers never contend on a lock.
pub struct ProxyService {
    config: Arc<Config>,
    upstream: Box<dyn UpstreamApi>,
    store: VectorStoreHandle,
}

/// Abstraction over the proxy flows used by the HTTP surface.
#[async_trait]
pub trait ProxyApi: Send + Sync {
    /// Upload a file, attach it to the store, and tag it with the namespace.
    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, ProxyError>;

    /// Answer a query from the store, falling back across payload shapes.
    async fn search(&self, request: SearchRequest) -> Result<SearchOutcome, ProxyError>;

    /// The store every upload and search uses.
    fn store(&self) -> &VectorStoreHandle;
}

impl ProxyService {
    /// Resolve the vector store and build the service. Fails if the store cannot be resolved.
    pub async fn new(
        config: Arc<Config>,
        upstream: Box<dyn UpstreamApi>,
    ) -> Result<Self, UpstreamError> {
        tracing::info!(name = %config.vector_store_name, "Resolving vector store");
        let store = resolve_vector_store(
            upstream.as_ref(),
            config.vector_store_id.as_deref(),
            &config.vector_store_name,
        )
        .await?;
        tracing::info!(store_id = %store.id, source = ?store.source, "Vector store ready");
        Ok(Self::with_store(config, upstream, store))
    }

    /// Build the service around an already resolved store.
    pub fn with_store(
        config: Arc<Config>,
        upstream: Box<dyn UpstreamApi>,
        store: VectorStoreHandle,
    ) -> Self {
        Self {
            config,
            upstream,
            store,
        }
    }
}

#[async_trait]
impl ProxyApi for ProxyService {
    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, ProxyError> {
        ingest(self.upstream.as_ref(), &self.store, request).await
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchOutcome, ProxyError> {
        search_with_fallback(
            self.upstream.as_ref(),
            &self.store.id,
            &self.config.openai_model,
            &self.config.search_variants,
            &request,
        )
        .await
    }

    fn store(&self) -> &VectorStoreHandle {
        &self.store
    }
}

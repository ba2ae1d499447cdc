//! Vector store resolution performed once at startup.

use crate::upstream::{UpstreamApi, UpstreamError};
use serde::Serialize;

/// Where the resolved vector store id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreSource {
    /// Taken from `VECTOR_STORE_ID` without contacting the upstream.
    Configured,
    /// Found among the existing upstream stores by exact name.
    Discovered,
    /// Created because no store with the configured name existed.
    Created,
}

/// Resolved vector store identity, constant for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorStoreHandle {
    /// Upstream vector store id used by every upload and search.
    pub id: String,
    /// Configured store name.
    pub name: String,
    /// How the id was obtained.
    pub source: StoreSource,
}

/// Obtain a usable vector store id: configured, else found by name, else created.
///
/// Not atomic across processes; two instances racing on an empty account may both create a
/// store with the same name.
pub async fn resolve_vector_store<U>(
    upstream: &U,
    configured_id: Option<&str>,
    name: &str,
) -> Result<VectorStoreHandle, UpstreamError>
where
    U: UpstreamApi + ?Sized,
{
    if let Some(id) = configured_id.map(str::trim).filter(|id| !id.is_empty()) {
        tracing::info!(store_id = id, "Using configured vector store");
        return Ok(VectorStoreHandle {
            id: id.to_string(),
            name: name.to_string(),
            source: StoreSource::Configured,
        });
    }

    let stores = upstream.list_vector_stores().await?;
    tracing::debug!(count = stores.len(), name, "Listed vector stores");
    if let Some(store) = stores
        .into_iter()
        .find(|store| store.name.as_deref() == Some(name))
    {
        tracing::info!(store_id = %store.id, name, "Discovered vector store by name");
        return Ok(VectorStoreHandle {
            id: store.id,
            name: name.to_string(),
            source: StoreSource::Discovered,
        });
    }

    let store = upstream.create_vector_store(name).await?;
    Ok(VectorStoreHandle {
        id: store.id,
        name: name.to_string(),
        source: StoreSource::Created,
    })
}

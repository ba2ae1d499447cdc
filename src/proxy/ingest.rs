//! Upload flow: create the file, attach it to the store, then tag it with the namespace.

use crate::proxy::types::{ProxyError, Stage, UploadOutcome, UploadRequest};
use crate::resolver::VectorStoreHandle;
use crate::upstream::UpstreamApi;
use serde_json::json;

/// Run the ingest flow against the resolved store.
///
/// Upload and attach failures are returned tagged with their stage. Namespace tagging is
/// advisory: a failure is logged and reported as `namespace_tagged: false`.
pub async fn ingest<U>(
    upstream: &U,
    store: &VectorStoreHandle,
    request: UploadRequest,
) -> Result<UploadOutcome, ProxyError>
where
    U: UpstreamApi + ?Sized,
{
    let UploadRequest { file, namespace } = request;
    let filename = file.filename.clone();
    let size = file.bytes.len();

    let file_id = upstream
        .create_file(file)
        .await
        .map_err(|source| ProxyError::Upstream {
            stage: Stage::Upload,
            source,
        })?;
    tracing::info!(file_id = %file_id, filename = %filename, size, "Uploaded file");

    let attach = upstream
        .attach_file(&store.id, &file_id)
        .await
        .map_err(|source| ProxyError::Upstream {
            stage: Stage::Attach,
            source,
        })?;
    tracing::info!(file_id = %file_id, store_id = %store.id, "Attached file to vector store");

    let mut namespace_tagged = false;
    if let Some(namespace) = namespace.as_deref() {
        match upstream
            .tag_file(&store.id, &file_id, json!({ "namespace": namespace }))
            .await
        {
            Ok(()) => namespace_tagged = true,
            Err(error) => {
                tracing::warn!(
                    file_id = %file_id,
                    namespace,
                    error = %error,
                    "Namespace tagging failed; continuing"
                );
            }
        }
    }

    Ok(UploadOutcome {
        file_id,
        vector_store_id: store.id.clone(),
        namespace,
        attach,
        namespace_tagged,
    })
}

//! HTTP client wrapper for the upstream document-search API.

use crate::config::{Config, UpstreamTimeouts};
use crate::upstream::types::{
    FileObject, FileUpload, ListVectorStoresResponse, UpstreamError, VectorStore,
};
use async_trait::async_trait;
use reqwest::{Client, Method, multipart};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

const LIST_PAGE_SIZE: &str = "100";

/// Capability surface the proxy needs from the upstream provider.
///
/// Flows depend on this trait rather than on [`UpstreamClient`] so they can run against an
/// in-memory fake.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Upload raw bytes and return the upstream file id.
    async fn create_file(&self, upload: FileUpload) -> Result<String, UpstreamError>;

    /// Attach an uploaded file to a vector store, returning the attachment record verbatim.
    async fn attach_file(&self, store_id: &str, file_id: &str) -> Result<Value, UpstreamError>;

    /// Replace the attributes stored on a vector store file.
    async fn tag_file(
        &self,
        store_id: &str,
        file_id: &str,
        attributes: Value,
    ) -> Result<(), UpstreamError>;

    /// Call the response-generation endpoint with a prepared payload.
    async fn generate_response(&self, payload: Value) -> Result<Value, UpstreamError>;

    /// Enumerate every vector store visible to the API key.
    async fn list_vector_stores(&self) -> Result<Vec<VectorStore>, UpstreamError>;

    /// Create a vector store with the given name.
    async fn create_vector_store(&self, name: &str) -> Result<VectorStore, UpstreamError>;
}

/// Lightweight reqwest-backed client for the upstream API.
pub struct UpstreamClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) timeouts: UpstreamTimeouts,
}

impl UpstreamClient {
    /// Construct a client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(concat!("vecproxy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url =
            normalize_base_url(&config.openai_base_url).map_err(UpstreamError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = !config.openai_api_key.is_empty(),
            "Initialized upstream HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.openai_api_key.clone(),
            timeouts: config.timeouts,
        })
    }

    fn request(&self, method: Method, path: &str, timeout: Duration) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        self.client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .timeout(timeout)
    }

    async fn read_json<T>(
        &self,
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if !status.is_success() {
            // A truncated error body must not hide the status the upstream already sent.
            let body = response.text().await.unwrap_or_default();
            let error = UpstreamError::UnexpectedStatus { status, body };
            tracing::error!(operation, error = %error, "Upstream request failed");
            return Err(error);
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| {
            tracing::error!(operation, error = %err, "Upstream returned an unreadable body");
            UpstreamError::MalformedResponse(format!("{operation}: {err}"))
        })
    }
}

#[async_trait]
impl UpstreamApi for UpstreamClient {
    async fn create_file(&self, upload: FileUpload) -> Result<String, UpstreamError> {
        let FileUpload {
            bytes,
            filename,
            content_type,
        } = upload;
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str(&content_type)?;
        let form = multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        let response = self
            .request(Method::POST, "files", self.timeouts.upload)
            .multipart(form)
            .send()
            .await?;
        let file: FileObject = self.read_json(response, "files.create").await?;
        tracing::debug!(file_id = %file.id, filename = %filename, size, "File uploaded");
        Ok(file.id)
    }

    async fn attach_file(&self, store_id: &str, file_id: &str) -> Result<Value, UpstreamError> {
        let response = self
            .request(
                Method::POST,
                &format!("vector_stores/{store_id}/files"),
                self.timeouts.attach,
            )
            .json(&json!({ "file_id": file_id }))
            .send()
            .await?;
        let record: Value = self.read_json(response, "vector_stores.files.create").await?;
        tracing::debug!(store_id, file_id, "File attached to vector store");
        Ok(record)
    }

    async fn tag_file(
        &self,
        store_id: &str,
        file_id: &str,
        attributes: Value,
    ) -> Result<(), UpstreamError> {
        let response = self
            .request(
                Method::POST,
                &format!("vector_stores/{store_id}/files/{file_id}"),
                self.timeouts.attach,
            )
            .json(&json!({ "attributes": attributes }))
            .send()
            .await?;
        let _: Value = self.read_json(response, "vector_stores.files.update").await?;
        Ok(())
    }

    async fn generate_response(&self, payload: Value) -> Result<Value, UpstreamError> {
        let response = self
            .request(Method::POST, "responses", self.timeouts.response)
            .json(&payload)
            .send()
            .await?;
        self.read_json(response, "responses.create").await
    }

    async fn list_vector_stores(&self) -> Result<Vec<VectorStore>, UpstreamError> {
        let mut after: Option<String> = None;
        let mut stores = Vec::new();

        loop {
            let mut query = vec![("limit", LIST_PAGE_SIZE.to_string())];
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }
            let response = self
                .request(Method::GET, "vector_stores", self.timeouts.attach)
                .query(&query)
                .send()
                .await?;
            let page: ListVectorStoresResponse =
                self.read_json(response, "vector_stores.list").await?;
            let last_id = page
                .last_id
                .or_else(|| page.data.last().map(|store| store.id.clone()));
            stores.extend(page.data);

            match (page.has_more, last_id) {
                (true, Some(next)) if after.as_deref() != Some(next.as_str()) => after = Some(next),
                _ => break,
            }
        }

        Ok(stores)
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStore, UpstreamError> {
        let response = self
            .request(Method::POST, "vector_stores", self.timeouts.attach)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let store: VectorStore = self.read_json(response, "vector_stores.create").await?;
        tracing::info!(store_id = %store.id, name, "Created vector store");
        Ok(store)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

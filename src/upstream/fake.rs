//! Scripted in-memory upstream used by unit tests.

use crate::upstream::{FileUpload, UpstreamApi, UpstreamError, VectorStore};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One canned reply for a scripted call.
pub(crate) enum Reply {
    Ok(Value),
    Status(u16, Value),
}

impl Reply {
    fn into_result(self) -> Result<Value, UpstreamError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Status(code, body) => Err(UpstreamError::UnexpectedStatus {
                status: StatusCode::from_u16(code).expect("valid status"),
                body: body.to_string(),
            }),
        }
    }
}

/// Records every call and answers from per-operation queues.
#[derive(Default)]
pub(crate) struct FakeUpstream {
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) payloads: Mutex<Vec<Value>>,
    pub(crate) files: Mutex<VecDeque<Reply>>,
    pub(crate) attaches: Mutex<VecDeque<Reply>>,
    pub(crate) tags: Mutex<VecDeque<Reply>>,
    pub(crate) responses: Mutex<VecDeque<Reply>>,
    pub(crate) stores: Mutex<Vec<VectorStore>>,
    pub(crate) listings: Mutex<VecDeque<Reply>>,
    pub(crate) creations: Mutex<VecDeque<Reply>>,
}

impl FakeUpstream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_responses(replies: Vec<Reply>) -> Self {
        let fake = Self::new();
        fake.responses.lock().expect("lock").extend(replies);
        fake
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    pub(crate) fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().expect("lock").clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("lock").push(call.into());
    }

    /// Fail with the next scripted error, if any; `Reply::Ok` entries pass through.
    fn scripted_failure(queue: &Mutex<VecDeque<Reply>>) -> Result<(), UpstreamError> {
        match queue.lock().expect("lock").pop_front() {
            Some(reply) => reply.into_result().map(|_| ()),
            None => Ok(()),
        }
    }

    fn next(queue: &Mutex<VecDeque<Reply>>, fallback: Value) -> Result<Value, UpstreamError> {
        queue
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(Reply::Ok(fallback))
            .into_result()
    }
}

/// Upstream 400 body complaining about an unknown parameter.
pub(crate) fn unknown_parameter(param: &str) -> Reply {
    Reply::Status(
        400,
        json!({
            "error": {
                "message": format!("Unknown parameter: '{param}'."),
                "type": "invalid_request_error",
                "param": param,
                "code": "unknown_parameter"
            }
        }),
    )
}

/// Upstream reply carrying the given text parts.
pub(crate) fn answer(parts: &[&str]) -> Reply {
    let content: Vec<Value> = parts
        .iter()
        .map(|text| json!({ "type": "output_text", "text": text, "annotations": [] }))
        .collect();
    Reply::Ok(json!({
        "id": "resp_1",
        "object": "response",
        "output": [
            { "type": "message", "role": "assistant", "content": content }
        ]
    }))
}

#[async_trait]
impl UpstreamApi for FakeUpstream {
    async fn create_file(&self, upload: FileUpload) -> Result<String, UpstreamError> {
        self.record(format!("create_file:{}", upload.filename));
        let value = Self::next(&self.files, json!({ "id": "file-1" }))?;
        Ok(value["id"].as_str().unwrap_or("file-1").to_string())
    }

    async fn attach_file(&self, store_id: &str, file_id: &str) -> Result<Value, UpstreamError> {
        self.record(format!("attach_file:{store_id}:{file_id}"));
        Self::next(
            &self.attaches,
            json!({ "id": file_id, "object": "vector_store.file", "status": "in_progress" }),
        )
    }

    async fn tag_file(
        &self,
        store_id: &str,
        file_id: &str,
        attributes: Value,
    ) -> Result<(), UpstreamError> {
        self.record(format!("tag_file:{store_id}:{file_id}"));
        self.payloads.lock().expect("lock").push(attributes);
        Self::next(&self.tags, json!({})).map(|_| ())
    }

    async fn generate_response(&self, payload: Value) -> Result<Value, UpstreamError> {
        self.record("generate_response");
        self.payloads.lock().expect("lock").push(payload);
        Self::next(&self.responses, json!({ "output": [] }))
    }

    async fn list_vector_stores(&self) -> Result<Vec<VectorStore>, UpstreamError> {
        self.record("list_vector_stores");
        Self::scripted_failure(&self.listings)?;
        Ok(self.stores.lock().expect("lock").clone())
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStore, UpstreamError> {
        self.record(format!("create_vector_store:{name}"));
        Self::scripted_failure(&self.creations)?;
        let mut stores = self.stores.lock().expect("lock");
        let store = VectorStore {
            id: format!("vs_created_{}", stores.len() + 1),
            name: Some(name.to_string()),
        };
        stores.push(store.clone());
        Ok(store)
    }
}

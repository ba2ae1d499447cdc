//! HTTP surface for the proxy.
//!
//! - `GET /health` – Liveness check.
//! - `GET /info` – The vector store id and name every upload and search uses.
//! - `POST /authcheck` – Validates `X-Action-Secret` and nothing else.
//! - `POST /upload` – Multipart `file` (plus optional `namespace`) forwarded to the upstream,
//!   attached to the store, then tagged. Failures carry `stage` and `upstream_status`.
//! - `POST /search` – JSON `{query, top_k?, namespace?}` answered through the payload-shape
//!   fallback. Failures list every attempted variant.
//!
//! `/authcheck`, `/upload`, and `/search` sit behind the shared-secret middleware, so a bad
//! secret is rejected before the body is read or the upstream is contacted.

use crate::config::Config;
use crate::gate::{AuthError, require_secret};
use crate::proxy::{
    Citation, PayloadVariant, ProxyApi, ProxyError, SearchRequest, UploadRequest,
    ValidationError, VariantDiagnostic, types::sanitize_namespace,
};
use crate::upstream::FileUpload;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, Query, State, multipart::MultipartRejection,
        rejection::BytesRejection,
    },
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

const DEFAULT_FILENAME: &str = "upload.bin";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Router-level settings derived from [`Config`].
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// Expected `X-Action-Secret` value.
    pub secret: Arc<str>,
    /// CORS origins; `*` allows any.
    pub allowed_origins: Vec<String>,
    /// Inbound body limit in bytes.
    pub max_body_bytes: usize,
}

impl RouterSettings {
    /// Extract router settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            secret: Arc::from(config.action_shared_secret.as_str()),
            allowed_origins: config.allowed_origins.clone(),
            max_body_bytes: config.max_upload_bytes,
        }
    }
}

/// Build the HTTP router exposing the proxy surface.
pub fn create_router<S>(service: Arc<S>, settings: RouterSettings) -> Router
where
    S: ProxyApi + 'static,
{
    let protected = Router::new()
        .route("/authcheck", post(authcheck))
        .route("/upload", post(upload::<S>))
        .route("/search", post(search::<S>))
        .route_layer(middleware::from_fn_with_state(
            settings.secret.clone(),
            require_secret,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info::<S>))
        .merge(protected)
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(cors_layer(&settings.allowed_origins))
        .with_state(service)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(
            origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Response body for `GET /info`.
#[derive(Serialize)]
struct InfoResponse {
    vector_store_id: String,
    vector_store_name: String,
}

async fn info<S>(State(service): State<Arc<S>>) -> Json<InfoResponse>
where
    S: ProxyApi,
{
    let store = service.store();
    Json(InfoResponse {
        vector_store_id: store.id.clone(),
        vector_store_name: store.name.clone(),
    })
}

async fn authcheck() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Query-string fallback for the upload namespace.
#[derive(Deserialize)]
struct UploadQuery {
    #[serde(default)]
    namespace: Option<String>,
}

/// Success response for `POST /upload`.
#[derive(Serialize)]
struct UploadResponse {
    ok: bool,
    file_id: String,
    vector_store_id: String,
    namespace: Option<String>,
    attach: Value,
    namespace_tagged: bool,
}

/// Forward a multipart upload to the ingest flow.
#[tracing::instrument(name = "upload", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn upload<S>(
    State(service): State<Arc<S>>,
    Query(query): Query<UploadQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError>
where
    S: ProxyApi,
{
    let multipart = multipart.map_err(|err| body_rejection(err.status(), err.body_text()))?;
    let request = read_upload(multipart, sanitize_namespace(query.namespace)).await?;
    let outcome = service.upload(request).await?;
    tracing::info!(
        file_id = %outcome.file_id,
        namespace_tagged = outcome.namespace_tagged,
        "Upload request completed"
    );
    Ok(Json(UploadResponse {
        ok: true,
        file_id: outcome.file_id,
        vector_store_id: outcome.vector_store_id,
        namespace: outcome.namespace,
        attach: outcome.attach,
        namespace_tagged: outcome.namespace_tagged,
    }))
}

async fn read_upload(
    mut multipart: Multipart,
    query_namespace: Option<String>,
) -> Result<UploadRequest, ValidationError> {
    let invalid = |err: axum::extract::multipart::MultipartError| {
        body_rejection(err.status(), err.body_text())
    };
    let mut file = None;
    let mut namespace = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(DEFAULT_FILENAME)
                    .to_string();
                let content_type = field
                    .content_type()
                    .filter(|value| value.parse::<HeaderValue>().is_ok() && value.contains('/'))
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let bytes = field.bytes().await.map_err(invalid)?;
                file = Some(FileUpload {
                    bytes: bytes.to_vec(),
                    filename,
                    content_type,
                });
            }
            Some("namespace") => {
                namespace = sanitize_namespace(Some(field.text().await.map_err(invalid)?));
            }
            _ => {}
        }
    }

    Ok(UploadRequest {
        file: file.ok_or(ValidationError::MissingFile)?,
        namespace: namespace.or(query_namespace),
    })
}

/// Keep the size-limit status distinct from a malformed form.
fn body_rejection(status: StatusCode, text: String) -> ValidationError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::PayloadTooLarge
    } else {
        ValidationError::InvalidBody(text)
    }
}

/// Success response for `POST /search`.
#[derive(Serialize)]
struct SearchResponse {
    ok: bool,
    text: String,
    citations: Vec<Citation>,
    variant: PayloadVariant,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attempts: Vec<VariantDiagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_id: Option<String>,
}

/// Validate the JSON body and run the fallback search.
#[tracing::instrument(name = "search", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn search<S>(
    State(service): State<Arc<S>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SearchResponse>, ApiError>
where
    S: ProxyApi,
{
    let body = body.map_err(|err| body_rejection(err.status(), err.body_text()))?;
    let request = parse_search_request(&body)?;
    tracing::debug!(
        query_len = request.query.len(),
        top_k = request.top_k,
        namespace = ?request.namespace,
        "Search request accepted"
    );
    let outcome = service.search(request).await?;
    Ok(Json(SearchResponse {
        ok: true,
        text: outcome.text,
        citations: outcome.citations,
        variant: outcome.variant,
        attempts: outcome.attempts,
        response_id: outcome.response_id,
    }))
}

/// Decode and validate a `/search` body without assuming the caller sent the right types.
pub fn parse_search_request(body: &[u8]) -> Result<SearchRequest, ValidationError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| ValidationError::InvalidBody(err.to_string()))?;
    let Value::Object(map) = value else {
        return Err(ValidationError::InvalidBody("expected a JSON object".into()));
    };

    let query = match map.get("query") {
        Some(Value::String(query)) => query.clone(),
        _ => return Err(ValidationError::MissingQuery),
    };
    let top_k = match map.get("top_k") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            value
                .as_u64()
                .filter(|count| *count > 0)
                .and_then(|count| u32::try_from(count).ok())
                .ok_or(ValidationError::InvalidField {
                    field: "top_k",
                    reason: "must be a positive integer",
                })?,
        ),
    };
    let namespace = match map.get("namespace") {
        None | Some(Value::Null) => None,
        Some(Value::String(namespace)) => Some(namespace.clone()),
        Some(_) => {
            return Err(ValidationError::InvalidField {
                field: "namespace",
                reason: "must be a string",
            });
        }
    };

    SearchRequest::new(query, top_k, namespace)
}

/// Errors rendered by the HTTP surface.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or wrong shared secret.
    Auth(AuthError),
    /// Caller input rejected before any upstream call.
    Validation(ValidationError),
    /// Upstream failure inside a flow.
    Proxy(ProxyError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(err) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "ok": false, "error": err.to_string() })),
            )
                .into_response(),
            Self::Validation(err @ ValidationError::PayloadTooLarge) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "ok": false, "error": err.to_string() })),
            )
                .into_response(),
            Self::Validation(err) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "error": err.to_string() })),
            )
                .into_response(),
            Self::Proxy(ProxyError::Upstream { stage, source }) => {
                tracing::error!(stage = %stage, error = %source, "Upstream call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({
                        "ok": false,
                        "stage": stage,
                        "upstream_status": source.status().map(|status| status.as_u16()),
                        "error": source.detail(),
                    })),
                )
                    .into_response()
            }
            Self::Proxy(ProxyError::SearchFailed(attempts)) => {
                tracing::error!(
                    attempts = attempts.len(),
                    "Search failed for every attempted variant"
                );
                let upstream_status = attempts.last().and_then(|attempt| attempt.upstream_status);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({
                        "ok": false,
                        "stage": "search",
                        "upstream_status": upstream_status,
                        "attempts": attempts,
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(inner: AuthError) -> Self {
        Self::Auth(inner)
    }
}

impl From<ValidationError> for ApiError {
    fn from(inner: ValidationError) -> Self {
        Self::Validation(inner)
    }
}

impl From<ProxyError> for ApiError {
    fn from(inner: ProxyError) -> Self {
        Self::Proxy(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::{SearchOutcome, Stage, UploadOutcome};
    use crate::resolver::{StoreSource, VectorStoreHandle};
    use crate::upstream::UpstreamError;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use reqwest::StatusCode as UpstreamStatus;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const SECRET: &str = "s3cret";
    const BOUNDARY: &str = "XBOUNDARYX";

    #[derive(Default)]
    struct StubProxy {
        uploads: Mutex<Vec<UploadRequest>>,
        searches: Mutex<Vec<SearchRequest>>,
        fail_with: Option<fn() -> ProxyError>,
    }

    impl StubProxy {
        fn failing(make: fn() -> ProxyError) -> Self {
            Self {
                fail_with: Some(make),
                ..Self::default()
            }
        }

        async fn upstream_calls(&self) -> usize {
            self.uploads.lock().await.len() + self.searches.lock().await.len()
        }
    }

    static STORE: std::sync::OnceLock<VectorStoreHandle> = std::sync::OnceLock::new();

    fn default_store() -> &'static VectorStoreHandle {
        STORE.get_or_init(|| VectorStoreHandle {
            id: "vs_test".into(),
            name: "docs".into(),
            source: StoreSource::Configured,
        })
    }

    #[async_trait]
    impl ProxyApi for StubProxy {
        async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, ProxyError> {
            let namespace = request.namespace.clone();
            self.uploads.lock().await.push(request);
            if let Some(make) = self.fail_with {
                return Err(make());
            }
            Ok(UploadOutcome {
                file_id: "file-1".into(),
                vector_store_id: self.store().id.clone(),
                namespace,
                attach: json!({ "id": "file-1", "status": "in_progress" }),
                namespace_tagged: true,
            })
        }

        async fn search(&self, request: SearchRequest) -> Result<SearchOutcome, ProxyError> {
            self.searches.lock().await.push(request);
            if let Some(make) = self.fail_with {
                return Err(make());
            }
            Ok(SearchOutcome {
                text: "answer".into(),
                citations: vec![Citation {
                    file_id: "file-1".into(),
                    filename: None,
                    quote: Some("snippet".into()),
                }],
                variant: PayloadVariant::NestedFileSearch,
                attempts: Vec::new(),
                response_id: None,
            })
        }

        fn store(&self) -> &VectorStoreHandle {
            default_store()
        }
    }

    fn app(service: Arc<StubProxy>) -> Router {
        app_with(service, &["*"], 1024 * 1024)
    }

    fn app_with(service: Arc<StubProxy>, origins: &[&str], max_body_bytes: usize) -> Router {
        create_router(
            service,
            RouterSettings {
                secret: Arc::from(SECRET),
                allowed_origins: origins.iter().map(|origin| origin.to_string()).collect(),
                max_body_bytes,
            },
        )
    }

    async fn allowed_origin(app: Router, origin: &str) -> Option<String> {
        let request = Request::get("/health")
            .header("origin", origin)
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("router response");
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn search_request(secret: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/search")
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header("X-Action-Secret", secret);
        }
        builder.body(Body::from(body.to_string())).expect("request")
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\""));
            if let Some(filename) = filename {
                body.push_str(&format!("; filename=\"{filename}\"\r\nContent-Type: text/plain"));
            }
            body.push_str("\r\n\r\n");
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn upload_request(uri: &str, secret: Option<&str>, body: String) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(secret) = secret {
            builder = builder.header("X-Action-Secret", secret);
        }
        builder.body(Body::from(body)).expect("request")
    }

    #[tokio::test]
    async fn health_and_info_need_no_secret() {
        let service = Arc::new(StubProxy::default());

        let (status, body) = send(
            app(service.clone()),
            Request::get("/health").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));

        let (status, body) = send(
            app(service),
            Request::get("/info").body(Body::empty()).expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "vector_store_id": "vs_test", "vector_store_name": "docs" })
        );
    }

    #[tokio::test]
    async fn protected_routes_reject_bad_secret_without_calling_upstream() {
        let service = Arc::new(StubProxy::default());

        for secret in [None, Some(""), Some("wrong")] {
            let (status, body) = send(
                app(service.clone()),
                search_request(secret, r#"{"query":"hello"}"#),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "bad secret");

            let (status, _) = send(
                app(service.clone()),
                upload_request(
                    "/upload",
                    secret,
                    multipart_body(&[("file", Some("a.txt"), "hello")]),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);

            let mut authcheck = Request::post("/authcheck");
            if let Some(secret) = secret {
                authcheck = authcheck.header("X-Action-Secret", secret);
            }
            let (status, _) = send(
                app(service.clone()),
                authcheck.body(Body::empty()).expect("request"),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        assert_eq!(service.upstream_calls().await, 0);
    }

    #[tokio::test]
    async fn authcheck_accepts_valid_secret() {
        let (status, body) = send(
            app(Arc::new(StubProxy::default())),
            Request::post("/authcheck")
                .header("X-Action-Secret", SECRET)
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn invalid_queries_fail_before_upstream() {
        let service = Arc::new(StubProxy::default());

        for body in [
            r#"{"query":""}"#,
            r#"{"query":"   "}"#,
            r#"{"query":42}"#,
            r#"{"query":null}"#,
            r#"{"query":["a"]}"#,
            r#"{"top_k":3}"#,
            r#"{"query":"ok","top_k":0}"#,
            r#"{"query":"ok","top_k":"six"}"#,
            r#"["query"]"#,
            "not json",
        ] {
            let (status, json) =
                send(app(service.clone()), search_request(Some(SECRET), body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {body} should be rejected");
            assert_eq!(json["ok"], false);
        }

        assert_eq!(service.upstream_calls().await, 0);
    }

    #[tokio::test]
    async fn search_returns_normalized_answer() {
        let service = Arc::new(StubProxy::default());
        let (status, body) = send(
            app(service.clone()),
            search_request(
                Some(SECRET),
                r#"{"query":" refunds ","top_k":4,"namespace":"hr"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["text"], "answer");
        assert_eq!(body["variant"], "nested_file_search");
        assert_eq!(body["citations"][0]["quote"], "snippet");
        assert!(body.get("attempts").is_none());

        let searches = service.searches.lock().await;
        assert_eq!(
            searches[0],
            SearchRequest {
                query: "refunds".into(),
                top_k: 4,
                namespace: Some("hr".into()),
            }
        );
    }

    #[tokio::test]
    async fn exhausted_search_maps_to_bad_gateway_with_attempts() {
        let service = Arc::new(StubProxy::failing(|| {
            ProxyError::SearchFailed(vec![
                VariantDiagnostic {
                    variant: PayloadVariant::ToolResources,
                    upstream_status: Some(400),
                    error: json!({
                        "error": { "message": "Unknown parameter: 'tool_resources'." }
                    }),
                    shape_rejection: true,
                },
                VariantDiagnostic {
                    variant: PayloadVariant::NestedFileSearch,
                    upstream_status: Some(400),
                    error: json!({
                        "error": { "message": "Unknown parameter: 'tools[0].file_search'." }
                    }),
                    shape_rejection: true,
                },
            ])
        }));

        let request = search_request(Some(SECRET), r#"{"query":"q"}"#);
        let (status, body) = send(app(service), request).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["stage"], "search");
        let attempts = body["attempts"].as_array().expect("attempts");
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0]["variant"], "tool_resources");
        assert_eq!(attempts[1]["variant"], "nested_file_search");
    }

    #[tokio::test]
    async fn upload_forwards_file_and_namespace() {
        let service = Arc::new(StubProxy::default());
        let body = multipart_body(&[
            ("namespace", None, " finance "),
            ("file", Some("report.txt"), "quarterly numbers"),
        ]);

        let (status, json) = send(
            app(service.clone()),
            upload_request("/upload?namespace=ignored", Some(SECRET), body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ok"], true);
        assert_eq!(json["file_id"], "file-1");
        assert_eq!(json["vector_store_id"], "vs_test");
        assert_eq!(json["namespace"], "finance");

        let uploads = service.uploads.lock().await;
        let upload = &uploads[0];
        assert_eq!(upload.file.filename, "report.txt");
        assert_eq!(upload.file.content_type, "text/plain");
        assert_eq!(upload.file.bytes, b"quarterly numbers".to_vec());
        assert_eq!(upload.namespace.as_deref(), Some("finance"));
    }

    #[tokio::test]
    async fn upload_uses_query_namespace_when_form_has_none() {
        let service = Arc::new(StubProxy::default());
        let body = multipart_body(&[("file", Some("a.txt"), "x")]);

        let (status, _) = send(
            app(service.clone()),
            upload_request("/upload?namespace=legal", Some(SECRET), body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            service.uploads.lock().await[0].namespace.as_deref(),
            Some("legal")
        );
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let service = Arc::new(StubProxy::default());
        let body = multipart_body(&[("namespace", None, "hr")]);

        let (status, json) = send(
            app(service.clone()),
            upload_request("/upload", Some(SECRET), body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "file required");
        assert_eq!(service.upstream_calls().await, 0);
    }

    #[tokio::test]
    async fn upload_failure_reports_stage_and_upstream_status() {
        let service = Arc::new(StubProxy::failing(|| ProxyError::Upstream {
            stage: Stage::Attach,
            source: UpstreamError::UnexpectedStatus {
                status: UpstreamStatus::NOT_FOUND,
                body: r#"{"error":{"message":"No vector store found"}}"#.into(),
            },
        }));
        let body = multipart_body(&[("file", Some("a.txt"), "x")]);

        let (status, json) =
            send(app(service), upload_request("/upload", Some(SECRET), body)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["stage"], "attach");
        assert_eq!(json["upstream_status"], 404);
        assert_eq!(json["error"]["error"]["message"], "No vector store found");
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let service = Arc::new(StubProxy::default());
        let content = "x".repeat(500);
        let body = multipart_body(&[("file", Some("big.txt"), content.as_str())]);

        let (status, json) = send(
            app_with(service.clone(), &["*"], 64),
            upload_request("/upload", Some(SECRET), body),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json, json!({ "ok": false, "error": "request body too large" }));
        assert_eq!(service.upstream_calls().await, 0);
    }

    #[tokio::test]
    async fn oversized_search_is_payload_too_large() {
        let service = Arc::new(StubProxy::default());
        let body = json!({ "query": "q".repeat(500) }).to_string();

        let (status, json) = send(
            app_with(service.clone(), &["*"], 64),
            search_request(Some(SECRET), &body),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"], "request body too large");
        assert_eq!(service.upstream_calls().await, 0);
    }

    #[tokio::test]
    async fn cors_echoes_listed_origin_only() {
        let service = Arc::new(StubProxy::default());
        let listed = || app_with(service.clone(), &["https://chat.example.com"], 1024);

        let echoed = allowed_origin(listed(), "https://chat.example.com").await;
        assert_eq!(echoed.as_deref(), Some("https://chat.example.com"));

        let unlisted = allowed_origin(listed(), "https://other.example.com").await;
        assert_eq!(unlisted, None);
    }

    #[tokio::test]
    async fn cors_wildcard_allows_any_origin() {
        let service = Arc::new(StubProxy::default());
        let origin = allowed_origin(app(service), "https://x.example").await;
        assert_eq!(origin.as_deref(), Some("*"));
    }

    #[test]
    fn parse_search_request_defaults_top_k() {
        let request =
            parse_search_request(br#"{"query":"hello","namespace":""}"#).expect("valid");
        assert_eq!(request.top_k, crate::proxy::DEFAULT_TOP_K);
        assert_eq!(request.namespace, None);
    }
}

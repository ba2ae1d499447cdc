//! Shared-secret check guarding the mutating endpoints.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

/// Header callers use to present the shared secret.
pub const SECRET_HEADER: &str = "x-action-secret";

/// Rejection raised when the caller's secret is missing or wrong.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("bad secret")]
pub struct AuthError;

/// Succeed only when both values are non-empty and equal.
///
/// Both sides are hashed first so the comparison time does not depend on where they differ
/// or on the expected secret's length.
pub fn verify_secret(provided: Option<&str>, expected: &str) -> Result<(), AuthError> {
    let Some(provided) = provided.filter(|value| !value.is_empty()) else {
        return Err(AuthError);
    };
    if expected.is_empty() {
        return Err(AuthError);
    }

    let lhs = Sha256::digest(provided.as_bytes());
    let rhs = Sha256::digest(expected.as_bytes());
    let diff = lhs
        .iter()
        .zip(rhs.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    if diff == 0 { Ok(()) } else { Err(AuthError) }
}

/// Extract the presented secret from request headers.
pub fn presented_secret(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Axum middleware rejecting requests that fail [`verify_secret`] before any handler runs.
pub async fn require_secret(
    State(expected): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Result<Response, crate::api::ApiError> {
    if let Err(err) = verify_secret(presented_secret(request.headers()), &expected) {
        tracing::warn!(
            path = %request.uri().path(),
            has_header = request.headers().contains_key(SECRET_HEADER),
            "Rejected request with bad secret"
        );
        return Err(err.into());
    }
    Ok(next.run(request).await)
}

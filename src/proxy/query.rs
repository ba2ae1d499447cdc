//! Search flow: try each payload variant in order until the upstream accepts one.

use crate::proxy::extract::normalize_response;
use crate::proxy::types::{ProxyError, SearchOutcome, SearchRequest, VariantDiagnostic};
use crate::proxy::variants::{PayloadVariant, QueryPayload, is_shape_rejection};
use crate::upstream::UpstreamApi;
use serde_json::Value;

/// Run the search against `store_id`, falling back across `variants`.
///
/// Stops at the first success. A failure that is not a shape rejection stops the loop at once,
/// so auth, quota, and model errors are reported as-is instead of being retried in other
/// shapes. When nothing succeeds every attempt is returned, in order.
pub async fn search_with_fallback<U>(
    upstream: &U,
    store_id: &str,
    model: &str,
    variants: &[PayloadVariant],
    request: &SearchRequest,
) -> Result<SearchOutcome, ProxyError>
where
    U: UpstreamApi + ?Sized,
{
    let params = QueryPayload {
        model,
        query: &request.query,
        store_id,
        top_k: request.top_k,
        namespace: request.namespace.as_deref(),
    };
    let mut attempts = Vec::with_capacity(variants.len());

    for &variant in variants {
        let payload = variant.build(&params);
        match upstream.generate_response(payload).await {
            Ok(response) => {
                let answer = normalize_response(&response);
                tracing::info!(
                    variant = %variant,
                    fallbacks = attempts.len(),
                    citations = answer.citations.len(),
                    "Search answered"
                );
                return Ok(SearchOutcome {
                    text: answer.text,
                    citations: answer.citations,
                    variant,
                    attempts,
                    response_id: response
                        .get("id")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                });
            }
            Err(error) => {
                let shape_rejection = is_shape_rejection(&error);
                let upstream_status = error.status().map(|status| status.as_u16());
                tracing::warn!(
                    variant = %variant,
                    upstream_status = ?upstream_status,
                    shape_rejection,
                    error = %error,
                    "Search variant rejected"
                );
                attempts.push(VariantDiagnostic {
                    variant,
                    upstream_status,
                    error: error.detail(),
                    shape_rejection,
                });
                if !shape_rejection {
                    break;
                }
            }
        }
    }

    Err(ProxyError::SearchFailed(attempts))
}

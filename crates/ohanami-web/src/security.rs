use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{self, HeaderName},
    },
    middleware::Next,
    response::Response,
};

use ohanami_core::OhanamiError;

use crate::WebState;
use crate::error::ohanami_error_response;

const BEARER_PREFIX: &str = "Bearer ";

pub async fn require_bearer_token(
    State(state): State<WebState>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX));
    let authorized = presented.is_some_and(|token| tokens_match(token, &state.auth_token));
    if !authorized {
        tracing::warn!(
            path = %request.uri().path(),
            presented = presented.is_some(),
            "rejected request with invalid bearer token"
        );
        return ohanami_error_response(
            OhanamiError::PermissionDenied("invalid bearer token".to_string()),
            "auth",
        );
    }
    next.run(request).await
}

// Compares every byte so response timing does not reveal the matching prefix length.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let (presented, expected) = (presented.as_bytes(), expected.as_bytes());
    presented.len() == expected.len()
        && presented
            .iter()
            .zip(expected)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut());
    response
}

fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
}

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::debug;

use super::error::ApiError;
use super::state::ApiState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Guards mutating routes with the configured key. Reads stay open.
pub async fn require_api_key(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    if is_read_only(request.method()) {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(candidate) if keys_match(candidate, expected) => next.run(request).await,
        _ => {
            debug!(
                target: "recipebox::http::auth",
                method = %request.method(),
                path = %request.uri().path(),
                "rejecting request without a valid API key"
            );
            ApiError::unauthorized().into_response()
        }
    }
}

fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn keys_match(candidate: &str, expected: &str) -> bool {
    candidate.as_bytes().ct_eq(expected.as_bytes()).into()
}

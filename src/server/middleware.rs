//! Correlation ids and shared-secret authentication

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::error::ApiError;
use crate::utils::{API_KEY_HEADER, REQUEST_ID_HEADER};

/// Correlation id of the request being handled
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Longest caller-supplied id that is echoed back
const MAX_REQUEST_ID_LEN: usize = 128;

fn caller_request_id(req: &Request) -> Option<String> {
    let value = req.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    (!value.is_empty() && value.len() <= MAX_REQUEST_ID_LEN).then(|| value.to_string())
}

/// Echo the caller's `x-request-id` or assign a fresh one, and log the exchange
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = caller_request_id(&req).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(RequestId(id.clone()));

    let started = Instant::now();
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    info!(
        request_id = %id,
        %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Handled request"
    );
    response
}

/// Paths reachable without the shared secret
const PUBLIC_PATHS: &[&str] = &["/health"];

/// Reject requests without the configured `x-api-key`; a no-op when no key is set
pub async fn require_api_key(
    State(expected): State<Option<Arc<str>>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected else {
        return next.run(req).await;
    };
    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    let supplied = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    if supplied.is_some_and(|key| key.as_bytes() == expected.as_bytes()) {
        return next.run(req).await;
    }

    let id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    warn!(request_id = %id, path = %req.uri().path(), "Rejected request without a valid api key");
    ApiError::Unauthorized.with_request_id(&id).into_response()
}

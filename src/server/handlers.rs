//! Route handlers; each maps one service operation to JSON

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::error::{ApiError, ApiFailure, fetch_status};
use super::middleware::RequestId;
use crate::browser_pool::EngineLauncher;
use crate::discovery::{DiscoverRequest, DiscoveryError};
use crate::document_capture::CaptureRequest;
use crate::renderer::{DocumentOptions, DocumentRenderer, PageRenderer};
use crate::service::{ServiceContext, ServiceError};
use crate::site_mapper::MapRequest;
use crate::utils::is_valid_url;

pub type SharedService<R, L> = Arc<ServiceContext<R, L>>;

/// Success body: the payload's fields plus the correlation id
#[derive(Serialize)]
struct Envelope<'a, T> {
    request_id: &'a str,
    #[serde(flatten)]
    body: T,
}

fn reply<T: Serialize>(request_id: &str, status: StatusCode, body: T) -> Response {
    (status, Json(Envelope { request_id, body })).into_response()
}

fn parse_body<T>(request_id: &str, body: Result<Json<T>, JsonRejection>) -> Result<T, ApiFailure> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()).with_request_id(request_id))
}

fn require_url(request_id: &str, url: &str) -> Result<(), ApiFailure> {
    if is_valid_url(url.trim()) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("'{url}' is not an absolute http(s) URL"))
            .with_request_id(request_id))
    }
}

/// `POST /v1/fetch`
#[derive(Debug, Deserialize)]
pub struct FetchBody {
    pub url: String,
    pub timeout_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    #[serde(default)]
    pub export_document: bool,
    pub document: Option<DocumentOptions>,
}

pub async fn fetch<R, L>(
    State(service): State<SharedService<R, L>>,
    Extension(RequestId(id)): Extension<RequestId>,
    body: Result<Json<FetchBody>, JsonRejection>,
) -> Result<Response, ApiFailure>
where
    R: PageRenderer + DocumentRenderer,
    L: EngineLauncher,
{
    let body = parse_body(&id, body)?;
    require_url(&id, &body.url)?;

    let mut request = service.fetch_request(body.url.trim());
    if let Some(ms) = body.timeout_ms {
        request = request.with_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = body.settle_delay_ms {
        request = request.with_settle_delay(Duration::from_millis(ms));
    }
    if body.export_document || body.document.is_some() {
        request = request.with_export(body.document.unwrap_or_default());
    }

    let outcome = service.fetch(request).await.map_err(|e| match e {
        ServiceError::InvalidUrl(_) => ApiError::BadRequest(e.to_string()).with_request_id(&id),
        other => ApiError::Internal(other.to_string()).with_request_id(&id),
    })?;
    info!(
        request_id = %id,
        url = %outcome.url,
        success = outcome.success,
        kind = ?outcome.error_kind,
        attempts = outcome.attempts,
        "Fetch finished"
    );
    Ok(reply(&id, fetch_status(outcome.error_kind), outcome))
}

/// `POST /v1/discover`
pub async fn discover<R, L>(
    State(service): State<SharedService<R, L>>,
    Extension(RequestId(id)): Extension<RequestId>,
    body: Result<Json<DiscoverRequest>, JsonRejection>,
) -> Result<Response, ApiFailure>
where
    R: PageRenderer + DocumentRenderer,
    L: EngineLauncher,
{
    let request = parse_body(&id, body)?;
    require_url(&id, &request.base_url)?;

    let result = service.discover(&request).await.map_err(|e| {
        let api = match e {
            DiscoveryError::InvalidUrl(_) => ApiError::BadRequest(e.to_string()),
            other => {
                error!(request_id = %id, error = %other, "Discovery failed");
                ApiError::Internal(other.to_string())
            }
        };
        api.with_request_id(&id)
    })?;

    if result.sites.is_empty() {
        return Err(ApiError::NotFound(format!("no sub-sites found under {}", request.base_url))
            .with_request_id(&id));
    }
    Ok(reply(&id, StatusCode::OK, result))
}

/// `POST /v1/map`
pub async fn map<R, L>(
    State(service): State<SharedService<R, L>>,
    Extension(RequestId(id)): Extension<RequestId>,
    body: Result<Json<MapRequest>, JsonRejection>,
) -> Result<Response, ApiFailure>
where
    R: PageRenderer + DocumentRenderer,
    L: EngineLauncher,
{
    let request = parse_body(&id, body)?;
    require_url(&id, &request.start_url)?;

    let result = service
        .map(&request)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(&id))?;
    Ok(reply(&id, StatusCode::OK, result))
}

/// `POST /v1/capture`
pub async fn capture<R, L>(
    State(service): State<SharedService<R, L>>,
    Extension(RequestId(id)): Extension<RequestId>,
    body: Result<Json<CaptureRequest>, JsonRejection>,
) -> Result<Response, ApiFailure>
where
    R: PageRenderer + DocumentRenderer,
    L: EngineLauncher,
{
    let request = parse_body(&id, body)?;
    for url in &request.urls {
        require_url(&id, url)?;
    }

    let result = service.capture(&request).await.map_err(|e| {
        let api = ApiError::from(e);
        if api.status().is_server_error() {
            error!(request_id = %id, error = %api, "Capture failed");
        }
        api.with_request_id(&id)
    })?;
    Ok(reply(&id, StatusCode::OK, result))
}

/// `GET /health`
pub async fn health<R, L>(
    State(service): State<SharedService<R, L>>,
    Extension(RequestId(id)): Extension<RequestId>,
) -> Response
where
    R: PageRenderer + DocumentRenderer,
    L: EngineLauncher,
{
    let report = service.health();
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    reply(&id, status, report)
}

/// `GET /v1/status`
pub async fn status<R, L>(
    State(service): State<SharedService<R, L>>,
    Extension(RequestId(id)): Extension<RequestId>,
) -> Response
where
    R: PageRenderer + DocumentRenderer,
    L: EngineLauncher,
{
    reply(&id, StatusCode::OK, service.status())
}

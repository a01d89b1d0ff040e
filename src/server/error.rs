//! Boundary error responses

use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::document_capture::CaptureError;
use crate::fetch_executor::ErrorKind;
use crate::site_mapper::MapError;
use crate::utils::REQUEST_ID_HEADER;

/// Everything the boundary can answer with besides success
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("missing or invalid api key")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Attach the correlation id the response will carry
    pub fn with_request_id(self, request_id: &str) -> ApiFailure {
        ApiFailure {
            request_id: request_id.to_string(),
            error: self,
        }
    }
}

impl From<MapError> for ApiError {
    fn from(err: MapError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<CaptureError> for ApiError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::NoTargets | CaptureError::InvalidUrl(_) => Self::BadRequest(err.to_string()),
            CaptureError::OutputDir { .. } => Self::Internal(err.to_string()),
        }
    }
}

/// HTTP status for a fetch outcome's classification
pub fn fetch_status(kind: Option<ErrorKind>) -> StatusCode {
    match kind {
        None => StatusCode::OK,
        Some(ErrorKind::QueueFull) => StatusCode::SERVICE_UNAVAILABLE,
        Some(ErrorKind::Blocked) => StatusCode::FORBIDDEN,
        Some(ErrorKind::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorKind::Timeout | ErrorKind::NetworkError) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    request_id: &'a str,
    error: String,
}

/// An [`ApiError`] bound to a request id
#[derive(Debug)]
pub struct ApiFailure {
    pub request_id: String,
    pub error: ApiError,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            request_id: &self.request_id,
            error: self.error.to_string(),
        };
        let mut response = (self.error.status(), Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&self.request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
}

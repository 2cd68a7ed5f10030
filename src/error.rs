use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::ocr::error::OcrError;

/// Failure talking to one of the external engines (OCR service, Ollama,
/// transcription or TTS server).
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{service} is unreachable: {details}")]
    Unavailable { service: &'static str, details: String },

    #[error("{service} did not respond within {seconds} seconds")]
    Timeout { service: &'static str, seconds: u64 },

    #[error("{service} returned HTTP {status}: {body}")]
    Status { service: &'static str, status: u16, body: String },

    #[error("{service} returned an unreadable response: {details}")]
    InvalidResponse { service: &'static str, details: String },
}

impl UpstreamError {
    pub fn service(&self) -> &'static str {
        match self {
            UpstreamError::Unavailable { service, .. }
            | UpstreamError::Timeout { service, .. }
            | UpstreamError::Status { service, .. }
            | UpstreamError::InvalidResponse { service, .. } => service,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UpstreamError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error returned by every handler; renders as `{"success": false, "detail": ...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required field or part is missing or malformed
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream(e) => e.status_code(),
            ApiError::Ocr(e) => e.status_code(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", detail);
        } else {
            tracing::warn!(status = status.as_u16(), "Request rejected: {}", detail);
        }

        (status, Json(ErrorBody { success: false, detail })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub mod backend;
pub mod gateway;
pub mod ocr;

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

/// Route serving the OpenAPI document of one service
pub(crate) fn openapi_route<S, D>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    D: OpenApi + 'static,
{
    Router::new().route("/api-docs/openapi.json", get(|| async { Json(D::openapi()) }))
}

/// Reject empty or whitespace-only text, returning it trimmed
pub(crate) fn require_text(text: &str) -> Result<&str, crate::error::ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(crate::error::ApiError::BadRequest("Text cannot be empty".to_string()));
    }
    Ok(trimmed)
}

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        State,
    },
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::{
    error::{ApiResult, ErrorBody},
    extract::{read_upload, UploadForm},
    models::{ExtractResponse, OcrHealthResponse, ServiceInfo},
    ocr::OcrService,
    OcrState,
};

#[derive(OpenApi)]
#[openapi(
    paths(root, health, extract),
    components(schemas(ExtractResponse, OcrHealthResponse, ServiceInfo, ErrorBody)),
    tags((name = "ocr", description = "Text extraction from images"))
)]
pub struct OcrApiDoc;

pub fn router() -> Router<Arc<OcrState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/extract", post(extract))
        .merge(super::openapi_route::<Arc<OcrState>, OcrApiDoc>())
}

#[utoipa::path(
    get,
    path = "/",
    tag = "ocr",
    responses(
        (status = 200, description = "Service banner", body = ServiceInfo)
    )
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "OCR Service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "ocr",
    responses(
        (status = 200, description = "Engine status; `degraded` when the engine is unusable", body = OcrHealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<OcrState>>) -> Json<OcrHealthResponse> {
    let engine = state.ocr.engine_name().to_string();
    let response = match state.ocr.health().await {
        Ok(report) => OcrHealthResponse {
            status: "healthy".to_string(),
            engine,
            version: report.version,
            languages: report.languages,
            details: None,
        },
        Err(e) => {
            tracing::warn!("OCR engine health check failed: {}", e);
            OcrHealthResponse {
                status: "degraded".to_string(),
                engine,
                version: None,
                languages: Vec::new(),
                details: Some(e.to_string()),
            }
        }
    };
    Json(response)
}

#[utoipa::path(
    post,
    path = "/extract",
    tag = "ocr",
    responses(
        (status = 200, description = "Recognized text", body = ExtractResponse),
        (status = 400, description = "Not an image, empty file or bad language", body = ErrorBody),
        (status = 422, description = "Missing `file` part", body = ErrorBody),
        (status = 500, description = "Engine failure or timeout", body = ErrorBody)
    )
)]
pub async fn extract(
    State(state): State<Arc<OcrState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ExtractResponse>> {
    let upload = read_upload(multipart, "file").await?;
    Ok(Json(recognize_upload(&state.ocr, upload).await?))
}

/// Run local OCR on an upload; shared with the backend's `/api/scan-notes`.
pub(crate) async fn recognize_upload(ocr: &OcrService, upload: UploadForm) -> ApiResult<ExtractResponse> {
    let lang = upload.field("lang").map(str::trim).map(str::to_string);
    let file = upload.file;

    tracing::info!(
        "OCR request for {} ({}, {} bytes)",
        file.filename,
        file.content_type,
        file.data.len()
    );

    let outcome = ocr
        .extract_from_bytes(&file.filename, &file.content_type, &file.data, lang.as_deref())
        .await?;

    Ok(ExtractResponse {
        success: true,
        text: outcome.text,
        filename: Some(file.filename),
        word_count: outcome.word_count,
    })
}

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
    error::{ApiError, ApiResult, ErrorBody, UpstreamError},
    extract::{read_upload, ApiJson},
    models::{
        DependencyHealth, DependencyStatus, ExtractResponse, HealthResponse, QuizRequest, QuizResponse,
        QuizType, ServiceInfo, ServicesHealth,
    },
    services::upstream::error_detail,
    utils::files,
    GatewayState,
};

#[derive(OpenApi)]
#[openapi(
    paths(root, health, scan, generate_quiz),
    components(schemas(
        ServiceInfo,
        HealthResponse,
        ServicesHealth,
        DependencyHealth,
        DependencyStatus,
        ExtractResponse,
        QuizRequest,
        QuizResponse,
        QuizType,
        ErrorBody
    )),
    tags((name = "gateway", description = "StudyMate API gateway"))
)]
pub struct GatewayApiDoc;

pub fn router() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/scan", post(scan))
        .route("/api/generate_quiz", post(generate_quiz))
        .merge(super::openapi_route::<Arc<GatewayState>, GatewayApiDoc>())
}

#[utoipa::path(
    get,
    path = "/",
    tag = "gateway",
    responses(
        (status = 200, description = "Service banner", body = ServiceInfo)
    )
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "StudyMate API Gateway".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "gateway",
    responses(
        (status = 200, description = "Health of the OCR service and Ollama", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    let (ocr, llm) = tokio::join!(state.ocr_client.health(), state.llm.health());
    let response = HealthResponse::from_services(ServicesHealth { ocr, llm });
    if response.status != "healthy" {
        tracing::warn!("Gateway dependencies degraded: {:?}", response.services);
    }
    Json(response)
}

#[utoipa::path(
    post,
    path = "/api/scan",
    tag = "gateway",
    responses(
        (status = 200, description = "Text recognized by the OCR service", body = ExtractResponse),
        (status = 400, description = "Empty upload or not an image", body = ErrorBody),
        (status = 422, description = "Missing `file` part", body = ErrorBody),
        (status = 500, description = "OCR service timed out or failed", body = ErrorBody),
        (status = 503, description = "OCR service unreachable", body = ErrorBody)
    )
)]
pub async fn scan(
    State(state): State<Arc<GatewayState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ExtractResponse>> {
    let upload = read_upload(multipart, "file").await?;
    let lang = upload.field("lang").map(str::trim).map(str::to_string);
    let file = upload.file;

    if !files::is_image_upload(&file.filename, &file.content_type) {
        return Err(ApiError::BadRequest(format!(
            "File must be an image, got '{}'",
            file.content_type
        )));
    }

    tracing::info!("Scanning {} ({} bytes)", file.filename, file.data.len());

    let result = state.ocr_client.extract(&file, lang.as_deref()).await.map_err(|e| match e {
        // The OCR service already validated the upload; relay its verdict
        UpstreamError::Status { status, body, .. } if (400..500).contains(&status) => {
            ApiError::BadRequest(error_detail(&body))
        }
        other => ApiError::Upstream(other),
    })?;

    if !result.success {
        return Err(ApiError::Upstream(UpstreamError::InvalidResponse {
            service: "ocr-service",
            details: "extraction reported failure".to_string(),
        }));
    }

    Ok(Json(ExtractResponse {
        success: true,
        text: result.text,
        filename: Some(file.filename),
        word_count: result.word_count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/generate_quiz",
    tag = "gateway",
    request_body = QuizRequest,
    responses(
        (status = 200, description = "Generated quiz questions", body = QuizResponse),
        (status = 400, description = "Empty text", body = ErrorBody),
        (status = 422, description = "Missing or malformed fields", body = ErrorBody),
        (status = 500, description = "LLM timed out or failed", body = ErrorBody),
        (status = 503, description = "LLM unreachable", body = ErrorBody)
    )
)]
pub async fn generate_quiz(
    State(state): State<Arc<GatewayState>>,
    ApiJson(request): ApiJson<QuizRequest>,
) -> ApiResult<Json<QuizResponse>> {
    let text = super::require_text(&request.text)?;

    tracing::info!("Generating {} quiz from {} characters", request.quiz_type, text.chars().count());
    let quiz = state.llm.generate_quiz(text, request.quiz_type).await?;

    Ok(Json(QuizResponse {
        success: true,
        quiz_type: request.quiz_type,
        quiz,
    }))
}

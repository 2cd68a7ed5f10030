use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        State,
    },
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::{
    error::{ApiError, ApiResult, ErrorBody},
    extract::{read_upload, ApiJson},
    models::{
        ContentRequest, ContentResponse, ContentType, DependencyHealth, DependencyStatus, ExtractResponse,
        HealthResponse, RootResponse, ServicesHealth, SpeechRequest, SpeechResponse, TranscriptionResponse,
    },
    services::transcription::NO_SPEECH_MESSAGE,
    utils::{files, text},
    BackendState,
};

#[derive(OpenApi)]
#[openapi(
    paths(root, health, scan_notes, process_audio, generate_content, text_to_speech),
    components(schemas(
        RootResponse,
        HealthResponse,
        ServicesHealth,
        DependencyHealth,
        DependencyStatus,
        ExtractResponse,
        TranscriptionResponse,
        ContentRequest,
        ContentResponse,
        ContentType,
        SpeechRequest,
        SpeechResponse,
        ErrorBody
    )),
    tags((name = "backend", description = "StudyMate study-material backend"))
)]
pub struct BackendApiDoc;

pub fn router() -> Router<Arc<BackendState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/scan-notes", post(scan_notes))
        .route("/api/process-audio", post(process_audio))
        .route("/api/generate-content", post(generate_content))
        .route("/api/text-to-speech", post(text_to_speech))
        .merge(super::openapi_route::<Arc<BackendState>, BackendApiDoc>())
}

#[utoipa::path(
    get,
    path = "/",
    tag = "backend",
    responses(
        (status = 200, description = "Service banner", body = RootResponse)
    )
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "StudyMate backend is running".to_string(),
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "backend",
    responses(
        (status = 200, description = "Health of the local OCR engine and Ollama", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<BackendState>>) -> Json<HealthResponse> {
    let ocr = async {
        match state.ocr.health().await {
            Ok(_) => DependencyHealth::healthy(),
            Err(e) => DependencyHealth::unhealthy(e.to_string()),
        }
    };
    let (ocr, llm) = tokio::join!(ocr, state.llm.health());
    Json(HealthResponse::from_services(ServicesHealth { ocr, llm }))
}

#[utoipa::path(
    post,
    path = "/api/scan-notes",
    tag = "backend",
    responses(
        (status = 200, description = "Recognized text", body = ExtractResponse),
        (status = 400, description = "Not an image or empty file", body = ErrorBody),
        (status = 422, description = "Missing `file` part", body = ErrorBody),
        (status = 500, description = "OCR engine failure", body = ErrorBody)
    )
)]
pub async fn scan_notes(
    State(state): State<Arc<BackendState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ExtractResponse>> {
    let upload = read_upload(multipart, "file").await?;
    Ok(Json(super::ocr::recognize_upload(&state.ocr, upload).await?))
}

#[utoipa::path(
    post,
    path = "/api/process-audio",
    tag = "backend",
    responses(
        (status = 200, description = "Transcript of the recording", body = TranscriptionResponse),
        (status = 400, description = "Not an audio file", body = ErrorBody),
        (status = 422, description = "Missing `file` part", body = ErrorBody),
        (status = 500, description = "Transcription failed or timed out", body = ErrorBody),
        (status = 503, description = "Transcription server unreachable", body = ErrorBody)
    )
)]
pub async fn process_audio(
    State(state): State<Arc<BackendState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<TranscriptionResponse>> {
    let file = read_upload(multipart, "file").await?.file;

    if !files::is_audio_upload(&file.filename, &file.content_type) {
        return Err(ApiError::BadRequest(format!(
            "File must be an audio recording, got '{}'",
            file.content_type
        )));
    }

    tracing::info!("Transcribing {} ({} bytes)", file.filename, file.data.len());
    let transcript = text::normalize_whitespace(&state.transcriber.transcribe(&file).await?);

    let (text, word_count) = if transcript.is_empty() {
        tracing::info!("No speech detected in {}", file.filename);
        (NO_SPEECH_MESSAGE.to_string(), 0)
    } else {
        let count = text::word_count(&transcript);
        (transcript, count)
    };

    Ok(Json(TranscriptionResponse {
        success: true,
        text,
        filename: file.filename,
        word_count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/generate-content",
    tag = "backend",
    request_body = ContentRequest,
    responses(
        (status = 200, description = "Generated study material", body = ContentResponse),
        (status = 400, description = "Empty text", body = ErrorBody),
        (status = 422, description = "Missing or malformed fields", body = ErrorBody),
        (status = 500, description = "LLM timed out or failed", body = ErrorBody),
        (status = 503, description = "LLM unreachable", body = ErrorBody)
    )
)]
pub async fn generate_content(
    State(state): State<Arc<BackendState>>,
    ApiJson(request): ApiJson<ContentRequest>,
) -> ApiResult<Json<ContentResponse>> {
    let text = super::require_text(&request.text)?;

    tracing::info!("Generating {} content from {} characters", request.content_type, text.chars().count());
    let content = state.llm.generate_content(text, request.content_type).await?;

    Ok(Json(ContentResponse {
        success: true,
        summary: content.summary,
        flashcards: content.flashcards,
        quiz: content.quiz,
    }))
}

#[utoipa::path(
    post,
    path = "/api/text-to-speech",
    tag = "backend",
    request_body = SpeechRequest,
    responses(
        (status = 200, description = "Base64-encoded audio", body = SpeechResponse),
        (status = 400, description = "Empty or overlong text, or invalid voice", body = ErrorBody),
        (status = 422, description = "Missing or malformed fields", body = ErrorBody),
        (status = 500, description = "Synthesis failed", body = ErrorBody),
        (status = 503, description = "TTS server unreachable", body = ErrorBody)
    )
)]
pub async fn text_to_speech(
    State(state): State<Arc<BackendState>>,
    ApiJson(request): ApiJson<SpeechRequest>,
) -> ApiResult<Json<SpeechResponse>> {
    let text = super::require_text(&request.text)?;

    let length = text.chars().count();
    if length > state.config.tts_max_chars {
        return Err(ApiError::BadRequest(format!(
            "Text is too long for speech synthesis ({} characters, maximum {})",
            length, state.config.tts_max_chars
        )));
    }

    let voice = request
        .voice
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(state.config.tts_voice.as_str());
    validate_voice(voice)?;

    let audio = state.tts.synthesize(text, voice).await?;
    tracing::info!(
        "Synthesized {} characters with {} ({} bytes of {})",
        length,
        state.tts.name(),
        audio.bytes.len(),
        audio.content_type
    );

    Ok(Json(SpeechResponse {
        success: true,
        audio: STANDARD.encode(&audio.bytes),
        content_type: audio.content_type,
        engine: state.tts.name().to_string(),
    }))
}

/// Voice names are passed to the engine as an argument; keep them to a safe charset.
fn validate_voice(voice: &str) -> ApiResult<()> {
    let valid = voice.len() <= 64
        && !voice.starts_with('-')
        && voice
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '/' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Invalid voice '{}'", voice)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_voice() {
        assert!(validate_voice("en").is_ok());
        assert!(validate_voice("en-us+f3").is_ok());
        assert!(validate_voice("mb/mb-en1").is_ok());
        assert!(validate_voice("--help").is_err());
        assert!(validate_voice("en; rm -rf /").is_err());
        assert!(validate_voice(&"a".repeat(65)).is_err());
    }
}

/*!
 * Test Helpers and Utilities
 *
 * Builders for test configurations, fake engines and ready-to-call routers.
 * Tests point the HTTP dependencies at wiremock servers by overriding the
 * URLs on the returned `Config`.
 */

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use image::{ImageFormat, Luma, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;

use crate::{
    build_backend_app, build_gateway_app, build_ocr_app,
    config::{Config, TtsEngineKind},
    ocr::{
        engine::{EngineHealth, OcrEngine},
        error::OcrError,
        OcrConfig, OcrService,
    },
    services::{
        llm::LlmService,
        ocr_client::OcrClient,
        transcription::TranscriptionClient,
        tts::{SynthesizedAudio, TtsEngine, TtsError},
    },
    BackendState, GatewayState, OcrState,
};

const MULTIPART_BOUNDARY: &str = "studymate-test-boundary";

/// Creates a test configuration with sensible defaults.
/// Every downstream URL points at a closed local port until a test overrides it.
pub fn create_test_config() -> Config {
    Config {
        server_address: Some("127.0.0.1:0".to_string()),
        cors_allowed_origins: Vec::new(),
        max_upload_size_mb: 5,
        temp_dir: std::env::temp_dir().to_string_lossy().to_string(),

        ocr_service_url: "http://127.0.0.1:9".to_string(),
        ocr_service_timeout_seconds: 5,

        ocr_language: "eng".to_string(),
        concurrent_ocr_jobs: 2,
        ocr_timeout_seconds: 10,

        ollama_url: "http://127.0.0.1:9".to_string(),
        ollama_model: "llama3.2".to_string(),
        llm_timeout_seconds: 5,
        llm_temperature: 0.7,
        llm_max_input_chars: 6000,

        transcription_url: "http://127.0.0.1:9".to_string(),
        transcription_model: "whisper-1".to_string(),
        transcription_timeout_seconds: 5,

        tts_engine: TtsEngineKind::Espeak,
        tts_url: None,
        tts_voice: "en".to_string(),
        tts_max_chars: 5000,
        tts_timeout_seconds: 5,
    }
}

/// OCR engine returning canned text without touching tesseract.
pub struct FakeOcrEngine {
    text: String,
    healthy: bool,
}

impl FakeOcrEngine {
    pub fn returning(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            text: text.into(),
            healthy: true,
        })
    }

    pub fn unhealthy() -> Arc<Self> {
        Arc::new(Self {
            text: String::new(),
            healthy: false,
        })
    }
}

#[async_trait]
impl OcrEngine for FakeOcrEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn recognize(
        &self,
        _image_path: &Path,
        _lang: &str,
        _permit: OwnedSemaphorePermit,
    ) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }

    async fn health(&self) -> Result<EngineHealth, OcrError> {
        if self.healthy {
            Ok(EngineHealth {
                version: Some("fake 1.0".to_string()),
                languages: vec!["eng".to_string()],
            })
        } else {
            Err(OcrError::TesseractNotInstalled)
        }
    }
}

/// TTS engine that echoes the text back as "audio".
pub struct FakeTtsEngine;

#[async_trait]
impl TtsEngine for FakeTtsEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedAudio, TtsError> {
        Ok(SynthesizedAudio {
            bytes: format!("{}:{}", voice, text).into_bytes().into(),
            content_type: "audio/wav".to_string(),
        })
    }
}

pub fn create_test_ocr_service(config: &Config, engine: Arc<dyn OcrEngine>) -> Arc<OcrService> {
    Arc::new(OcrService::new(engine, OcrConfig::from(config)))
}

pub fn create_test_gateway_app(config: Config) -> Router {
    let ocr_client = OcrClient::new(config.ocr_service_url.clone(), config.ocr_service_timeout())
        .expect("Failed to build OCR client");
    let llm = LlmService::from_config(&config).expect("Failed to build LLM service");
    build_gateway_app(Arc::new(GatewayState {
        config,
        ocr_client,
        llm,
    }))
}

pub fn create_test_ocr_app(config: Config, engine: Arc<dyn OcrEngine>) -> Router {
    let ocr = create_test_ocr_service(&config, engine);
    build_ocr_app(Arc::new(OcrState { config, ocr }))
}

pub fn create_test_backend_app(config: Config, engine: Arc<dyn OcrEngine>, tts: Arc<dyn TtsEngine>) -> Router {
    let ocr = create_test_ocr_service(&config, engine);
    let llm = LlmService::from_config(&config).expect("Failed to build LLM service");
    let transcriber = TranscriptionClient::from_config(&config).expect("Failed to build transcription client");
    build_backend_app(Arc::new(BackendState {
        config,
        ocr,
        llm,
        transcriber,
        tts,
    }))
}

/// Encode a white PNG; with `with_mark` a dark block is drawn in the middle.
pub fn create_test_png(width: u32, height: u32, with_mark: bool) -> Vec<u8> {
    let mut img = RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
    if with_mark {
        for y in height / 3..(2 * height / 3) {
            for x in width / 4..(3 * width / 4) {
                img.put_pixel(x, y, image::Rgb([0, 0, 0]));
            }
        }
    }
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .expect("Failed to encode test PNG");
    buffer.into_inner()
}

/// Encode a grayscale PNG with black text-like stripes, for engines that need real ink.
pub fn create_test_gray_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::GrayImage::from_fn(width, height, |_, y| {
        if (y / 8) % 2 == 0 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .expect("Failed to encode test PNG");
    buffer.into_inner()
}

/// Build a multipart request carrying one file part plus optional text fields.
pub fn multipart_request(
    uri: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
    extra_fields: &[(&str, &str)],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in extra_fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                MULTIPART_BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            MULTIPART_BOUNDARY, field, filename, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(body))
        .expect("Failed to build multipart request")
}

/// Multipart request whose only part is a plain text field (no file).
pub fn multipart_without_file(uri: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
        b = MULTIPART_BOUNDARY
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(body))
        .expect("Failed to build multipart request")
}

pub fn json_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build JSON request")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build GET request")
}

/// Split a response into its status and parsed JSON body.
pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Ollama `/api/generate` reply wrapping `text` as the model output.
pub fn ollama_reply(text: &str) -> Value {
    serde_json::json!({
        "model": "llama3.2",
        "created_at": "2024-01-01T00:00:00Z",
        "response": text,
        "done": true
    })
}

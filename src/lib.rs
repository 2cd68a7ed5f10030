pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod routes;
pub mod services;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use config::Config;
use ocr::OcrService;
use services::{
    llm::LlmService,
    ocr_client::OcrClient,
    transcription::TranscriptionClient,
    tts::{self, TtsEngine},
};

/// State of the API gateway: fronts the OCR microservice and Ollama
pub struct GatewayState {
    pub config: Config,
    pub ocr_client: OcrClient,
    pub llm: LlmService,
}

impl GatewayState {
    pub fn from_config(config: Config) -> Result<Self> {
        let ocr_client = OcrClient::new(config.ocr_service_url.clone(), config.ocr_service_timeout())
            .context("Failed to build OCR service client")?;
        let llm = LlmService::from_config(&config).context("Failed to build Ollama client")?;
        Ok(Self { config, ocr_client, llm })
    }
}

/// State of the standalone OCR microservice
pub struct OcrState {
    pub config: Config,
    pub ocr: Arc<OcrService>,
}

impl OcrState {
    pub fn from_config(config: Config) -> Self {
        let ocr = Arc::new(OcrService::new_with_config(&config));
        Self { config, ocr }
    }
}

/// State of the backend aggregator: local OCR, LLM, speech-to-text and TTS
pub struct BackendState {
    pub config: Config,
    pub ocr: Arc<OcrService>,
    pub llm: LlmService,
    pub transcriber: TranscriptionClient,
    pub tts: Arc<dyn TtsEngine>,
}

impl BackendState {
    pub fn from_config(config: Config) -> Result<Self> {
        let ocr = Arc::new(OcrService::new_with_config(&config));
        let llm = LlmService::from_config(&config).context("Failed to build Ollama client")?;
        let transcriber =
            TranscriptionClient::from_config(&config).context("Failed to build transcription client")?;
        let tts = tts::engine_from_config(&config).context("Failed to build TTS engine")?;
        Ok(Self {
            config,
            ocr,
            llm,
            transcriber,
            tts,
        })
    }
}

pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    with_common_layers(routes::gateway::router(), &state.config).with_state(state)
}

pub fn build_ocr_app(state: Arc<OcrState>) -> Router {
    with_common_layers(routes::ocr::router(), &state.config).with_state(state)
}

pub fn build_backend_app(state: Arc<BackendState>) -> Router {
    with_common_layers(routes::backend::router(), &state.config).with_state(state)
}

fn with_common_layers<S>(router: Router<S>, config: &Config) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(cors_layer(config))
            .layer(DefaultBodyLimit::max(config.max_upload_bytes())),
    )
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

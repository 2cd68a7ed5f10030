use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::UpstreamError;
use crate::extract::UploadedFile;
use crate::services::upstream::{classify_request_error, status_error};

const SERVICE: &str = "transcription";

/// Returned instead of an empty transcript
pub const NO_SPEECH_MESSAGE: &str = "No speech could be detected in the audio.";

#[derive(Debug, Deserialize)]
struct TranscriptionBody {
    text: String,
}

/// Speech-to-text over the OpenAI-compatible `/v1/audio/transcriptions`
/// endpoint (whisper.cpp server, faster-whisper-server, LocalAI, ...).
#[derive(Clone)]
pub struct TranscriptionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl TranscriptionClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.transcription_url.clone(),
            config.transcription_model.clone(),
            config.transcription_timeout(),
        )
    }

    /// Transcribe an uploaded recording; whitespace-only output becomes an empty string.
    pub async fn transcribe(&self, file: &UploadedFile) -> Result<String, UpstreamError> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| UpstreamError::InvalidResponse {
                service: SERVICE,
                details: format!("invalid content type '{}': {}", file.content_type, e),
            })?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_request_error(SERVICE, self.timeout, &e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let body: TranscriptionBody = response.json().await.map_err(|e| UpstreamError::InvalidResponse {
            service: SERVICE,
            details: e.to_string(),
        })?;

        Ok(body.text.trim().to_string())
    }
}

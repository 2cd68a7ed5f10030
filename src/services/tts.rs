use async_trait::async_trait;
use axum::body::Bytes;
use serde::Serialize;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::{Config, TtsEngineKind};
use crate::error::{ApiError, UpstreamError};
use crate::services::upstream::{classify_request_error, status_error};

const HTTP_SERVICE: &str = "tts";

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("{binary} is not installed or not on PATH")]
    EngineNotInstalled { binary: String },

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Speech synthesis produced no audio")]
    EmptyAudio,

    #[error("Speech synthesis timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl From<TtsError> for ApiError {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::Upstream(e) => ApiError::Upstream(e),
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub bytes: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait TtsEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedAudio, TtsError>;
}

/// Pick the engine configured by `TTS_ENGINE`.
pub fn engine_from_config(config: &Config) -> anyhow::Result<Arc<dyn TtsEngine>> {
    match config.tts_engine {
        TtsEngineKind::Espeak => Ok(Arc::new(EspeakEngine::new(config.tts_timeout()))),
        TtsEngineKind::Http => {
            let url = config
                .tts_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("TTS_ENGINE=http requires TTS_URL"))?;
            Ok(Arc::new(HttpTtsEngine::new(url, config.tts_timeout())?))
        }
    }
}

/// Spawns `espeak-ng --stdout`, feeding the text on stdin.
///
/// The child is killed when synthesis exceeds `timeout`.
pub struct EspeakEngine {
    binary: String,
    timeout: Duration,
}

impl EspeakEngine {
    pub fn new(timeout: Duration) -> Self {
        Self::with_binary("espeak-ng", timeout)
    }

    pub fn with_binary(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl TtsEngine for EspeakEngine {
    fn name(&self) -> &'static str {
        "espeak-ng"
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedAudio, TtsError> {
        let mut child = Command::new(&self.binary)
            .args(["--stdout", "-v", voice])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TtsError::EngineNotInstalled {
                        binary: self.binary.clone(),
                    }
                } else {
                    TtsError::SynthesisFailed(e.to_string())
                }
            })?;

        let stdin = child.stdin.take();
        let run = async move {
            // Text goes through stdin so it is never parsed as a flag
            if let Some(mut stdin) = stdin {
                stdin
                    .write_all(text.as_bytes())
                    .await
                    .map_err(|e| TtsError::SynthesisFailed(format!("failed to write text: {}", e)))?;
            }
            child
                .wait_with_output()
                .await
                .map_err(|e| TtsError::SynthesisFailed(e.to_string()))
        };

        // Dropping `run` on expiry drops the child, and kill_on_drop reaps it
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| TtsError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(TtsError::SynthesisFailed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(TtsError::EmptyAudio);
        }

        Ok(SynthesizedAudio {
            bytes: Bytes::from(output.stdout),
            content_type: "audio/wav".to_string(),
        })
    }
}

#[derive(Serialize)]
struct HttpTtsRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

/// POSTs `{text, voice}` to an HTTP synthesis server and returns the audio body.
pub struct HttpTtsEngine {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpTtsEngine {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }
}

#[async_trait]
impl TtsEngine for HttpTtsEngine {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedAudio, TtsError> {
        let response = self
            .client
            .post(&self.url)
            .json(&HttpTtsRequest { text, voice })
            .send()
            .await
            .map_err(|e| classify_request_error(HTTP_SERVICE, self.timeout, &e))?;

        if !response.status().is_success() {
            return Err(status_error(HTTP_SERVICE, response).await.into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/wav")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_request_error(HTTP_SERVICE, self.timeout, &e))?;
        if bytes.is_empty() {
            return Err(TtsError::EmptyAudio);
        }

        Ok(SynthesizedAudio { bytes, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_espeak_binary() {
        let engine = EspeakEngine::with_binary("definitely-not-espeak-binary", Duration::from_secs(5));
        let err = engine.synthesize("hello", "en").await.unwrap_err();
        assert!(matches!(err, TtsError::EngineNotInstalled { .. }));

        let api: ApiError = err.into();
        assert_eq!(api.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_espeak_is_killed_after_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-espeak");
        std::fs::write(&script, "#!/bin/sh\ncat >/dev/null\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = EspeakEngine::with_binary(script.to_string_lossy(), Duration::from_secs(1));
        let started = std::time::Instant::now();
        let err = engine.synthesize("hello", "en").await.unwrap_err();

        assert!(matches!(err, TtsError::Timeout { seconds: 1 }));
        assert!(started.elapsed() < Duration::from_secs(10));

        let api: ApiError = err.into();
        assert_eq!(api.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_espeak_output_is_returned_as_wav() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-espeak");
        std::fs::write(&script, "#!/bin/sh\ncat >/dev/null\nprintf 'RIFFdata'\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = EspeakEngine::with_binary(script.to_string_lossy(), Duration::from_secs(5));
        let audio = engine.synthesize("hello", "en").await.unwrap();
        assert_eq!(&audio.bytes[..], b"RIFFdata");
        assert_eq!(audio.content_type, "audio/wav");
    }

    #[test]
    fn test_upstream_errors_keep_their_status() {
        let err = TtsError::Upstream(UpstreamError::Unavailable {
            service: "tts",
            details: "connection refused".to_string(),
        });
        let api: ApiError = err.into();
        assert_eq!(api.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}

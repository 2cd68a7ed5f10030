use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;
use url::Url;

/// Which TTS backend the backend service talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtsEngineKind {
    /// Spawn `espeak-ng --stdout` locally
    Espeak,
    /// POST to an HTTP synthesis server
    Http,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address; `None` lets each service fall back to its own default port
    pub server_address: Option<String>,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_size_mb: u64,
    pub temp_dir: String,

    // OCR microservice (as seen from the gateway)
    pub ocr_service_url: String,
    pub ocr_service_timeout_seconds: u64,

    // Local OCR engine
    pub ocr_language: String,
    pub concurrent_ocr_jobs: usize,
    pub ocr_timeout_seconds: u64,

    // Ollama
    pub ollama_url: String,
    pub ollama_model: String,
    pub llm_timeout_seconds: u64,
    pub llm_temperature: f32,
    pub llm_max_input_chars: usize,

    // Speech-to-text
    pub transcription_url: String,
    pub transcription_model: String,
    pub transcription_timeout_seconds: u64,

    // Text-to-speech
    pub tts_engine: TtsEngineKind,
    pub tts_url: Option<String>,
    pub tts_voice: String,
    pub tts_max_chars: usize,
    pub tts_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let concurrent_ocr_jobs = match get("OCR_CONCURRENT_JOBS") {
            Some(raw) => parse_number::<usize>("OCR_CONCURRENT_JOBS", &raw)?,
            None => detect_cpu_cores(),
        };
        if concurrent_ocr_jobs == 0 {
            return Err(anyhow!("OCR_CONCURRENT_JOBS must be at least 1"));
        }

        let tts_engine = match get("TTS_ENGINE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("espeak") | Some("espeak-ng") => TtsEngineKind::Espeak,
            Some("http") => TtsEngineKind::Http,
            Some(other) => return Err(anyhow!("Unknown TTS_ENGINE '{}': expected 'espeak' or 'http'", other)),
        };
        let tts_url = get("TTS_URL").map(|u| validate_url("TTS_URL", &u)).transpose()?;
        if tts_engine == TtsEngineKind::Http && tts_url.is_none() {
            return Err(anyhow!("TTS_ENGINE=http requires TTS_URL to be set"));
        }

        let llm_temperature = match get("LLM_TEMPERATURE") {
            Some(raw) => parse_number::<f32>("LLM_TEMPERATURE", &raw)?,
            None => 0.7,
        };
        if !(0.0..=2.0).contains(&llm_temperature) {
            return Err(anyhow!("LLM_TEMPERATURE must be between 0.0 and 2.0, got {}", llm_temperature));
        }

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            server_address: get("SERVER_ADDRESS"),
            cors_allowed_origins,
            max_upload_size_mb: number_or("MAX_UPLOAD_SIZE_MB", get("MAX_UPLOAD_SIZE_MB"), 25)?,
            temp_dir: get("TEMP_DIR").unwrap_or_else(|| env::temp_dir().to_string_lossy().to_string()),

            ocr_service_url: validate_url(
                "OCR_SERVICE_URL",
                &get("OCR_SERVICE_URL").unwrap_or_else(|| "http://localhost:8001".to_string()),
            )?,
            ocr_service_timeout_seconds: number_or(
                "OCR_SERVICE_TIMEOUT_SECONDS",
                get("OCR_SERVICE_TIMEOUT_SECONDS"),
                60,
            )?,

            ocr_language: get("OCR_LANGUAGE").unwrap_or_else(|| "eng".to_string()),
            concurrent_ocr_jobs,
            ocr_timeout_seconds: number_or("OCR_TIMEOUT_SECONDS", get("OCR_TIMEOUT_SECONDS"), 60)?,

            ollama_url: validate_url(
                "OLLAMA_URL",
                &get("OLLAMA_URL").unwrap_or_else(|| "http://localhost:11434".to_string()),
            )?,
            ollama_model: get("OLLAMA_MODEL").unwrap_or_else(|| "llama3.2".to_string()),
            llm_timeout_seconds: number_or("LLM_TIMEOUT_SECONDS", get("LLM_TIMEOUT_SECONDS"), 120)?,
            llm_temperature,
            llm_max_input_chars: number_or("LLM_MAX_INPUT_CHARS", get("LLM_MAX_INPUT_CHARS"), 6000)?,

            transcription_url: validate_url(
                "TRANSCRIPTION_URL",
                &get("TRANSCRIPTION_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
            )?,
            transcription_model: get("TRANSCRIPTION_MODEL").unwrap_or_else(|| "whisper-1".to_string()),
            transcription_timeout_seconds: number_or(
                "TRANSCRIPTION_TIMEOUT_SECONDS",
                get("TRANSCRIPTION_TIMEOUT_SECONDS"),
                300,
            )?,

            tts_engine,
            tts_url,
            tts_voice: get("TTS_VOICE").unwrap_or_else(|| "en".to_string()),
            tts_max_chars: number_or("TTS_MAX_CHARS", get("TTS_MAX_CHARS"), 5000)?,
            tts_timeout_seconds: number_or("TTS_TIMEOUT_SECONDS", get("TTS_TIMEOUT_SECONDS"), 60)?,
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_size_mb as usize).saturating_mul(1024 * 1024)
    }

    pub fn ocr_service_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_service_timeout_seconds)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_seconds)
    }

    pub fn transcription_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription_timeout_seconds)
    }

    pub fn tts_timeout(&self) -> Duration {
        Duration::from_secs(self.tts_timeout_seconds)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_seconds)
    }

    /// Resolve the bind address, falling back to the service's own default.
    pub fn bind_address(&self, default: &str) -> String {
        self.server_address.clone().unwrap_or_else(|| default.to_string())
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("Invalid value for {}: '{}'", key, raw))
}

fn number_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => parse_number(key, &raw),
        None => Ok(default),
    }
}

/// Validate a base URL and strip any trailing slash so paths can be appended.
fn validate_url(key: &str, raw: &str) -> Result<String> {
    let parsed = Url::parse(raw).with_context(|| format!("{} is not a valid URL: '{}'", key, raw))?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
        other => Err(anyhow!("{} must use http or https, got '{}'", key, other)),
    }
}

fn detect_cpu_cores() -> usize {
    match std::thread::available_parallelism() {
        Ok(cores) => cores.get(),
        Err(e) => {
            tracing::warn!("Failed to detect CPU cores, defaulting OCR concurrency to 2: {}", e);
            2
        }
    }
}

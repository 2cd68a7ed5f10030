use crate::config::{Config, TtsEngineKind};
use std::collections::HashMap;
use std::time::Duration;

// Build a config from a fixed set of variables, ignoring the process environment
fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_defaults_when_nothing_is_set() {
    let config = config_from(&[]).expect("Config should load with defaults");

    assert_eq!(config.server_address, None);
    assert_eq!(config.ocr_service_url, "http://localhost:8001");
    assert_eq!(config.ollama_url, "http://localhost:11434");
    assert_eq!(config.ollama_model, "llama3.2");
    assert_eq!(config.llm_timeout_seconds, 120);
    assert_eq!(config.ocr_language, "eng");
    assert_eq!(config.max_upload_size_mb, 25);
    assert_eq!(config.tts_engine, TtsEngineKind::Espeak);
    assert_eq!(config.tts_voice, "en");
    assert_eq!(config.tts_max_chars, 5000);
    assert!(config.concurrent_ocr_jobs >= 1);
    assert!(config.cors_allowed_origins.is_empty());
}

#[test]
fn test_bind_address_falls_back_to_service_default() {
    let config = config_from(&[]).unwrap();
    assert_eq!(config.bind_address("0.0.0.0:8001"), "0.0.0.0:8001");

    let config = config_from(&[("SERVER_ADDRESS", "127.0.0.1:9000")]).unwrap();
    assert_eq!(config.bind_address("0.0.0.0:8001"), "127.0.0.1:9000");
}

#[test]
fn test_urls_are_validated_and_trimmed() {
    let config = config_from(&[
        ("OLLAMA_URL", "http://ollama:11434/"),
        ("OCR_SERVICE_URL", "https://ocr.internal"),
    ])
    .unwrap();
    assert_eq!(config.ollama_url, "http://ollama:11434");
    assert_eq!(config.ocr_service_url, "https://ocr.internal");

    assert!(config_from(&[("OLLAMA_URL", "not a url")]).is_err());
    assert!(config_from(&[("OCR_SERVICE_URL", "ftp://ocr.internal")]).is_err());
}

#[test]
fn test_invalid_numbers_are_rejected() {
    let err = config_from(&[("LLM_TIMEOUT_SECONDS", "soon")]).unwrap_err();
    assert!(err.to_string().contains("LLM_TIMEOUT_SECONDS"));

    assert!(config_from(&[("MAX_UPLOAD_SIZE_MB", "-1")]).is_err());
    assert!(config_from(&[("OCR_CONCURRENT_JOBS", "0")]).is_err());
    assert!(config_from(&[("LLM_TEMPERATURE", "3.5")]).is_err());
}

#[test]
fn test_blank_values_use_defaults() {
    let config = config_from(&[("OLLAMA_MODEL", "   "), ("LLM_TIMEOUT_SECONDS", "")]).unwrap();
    assert_eq!(config.ollama_model, "llama3.2");
    assert_eq!(config.llm_timeout(), Duration::from_secs(120));
}

#[test]
fn test_tts_engine_selection() {
    let config = config_from(&[("TTS_ENGINE", "HTTP"), ("TTS_URL", "http://tts:5002/api/tts")]).unwrap();
    assert_eq!(config.tts_engine, TtsEngineKind::Http);
    assert_eq!(config.tts_url.as_deref(), Some("http://tts:5002/api/tts"));

    // http without a URL cannot work
    assert!(config_from(&[("TTS_ENGINE", "http")]).is_err());
    assert!(config_from(&[("TTS_ENGINE", "festival")]).is_err());

    let config = config_from(&[("TTS_ENGINE", "espeak-ng")]).unwrap();
    assert_eq!(config.tts_engine, TtsEngineKind::Espeak);
}

#[test]
fn test_cors_origins_are_split() {
    let config = config_from(&[(
        "CORS_ALLOWED_ORIGINS",
        "http://localhost:3000, https://studymate.app,,",
    )])
    .unwrap();
    assert_eq!(
        config.cors_allowed_origins,
        vec!["http://localhost:3000".to_string(), "https://studymate.app".to_string()]
    );
}

#[test]
fn test_upload_limit_in_bytes() {
    let config = config_from(&[("MAX_UPLOAD_SIZE_MB", "2")]).unwrap();
    assert_eq!(config.max_upload_bytes(), 2 * 1024 * 1024);
}

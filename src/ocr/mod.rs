pub mod engine;
pub mod error;
pub mod health;
pub mod preprocess;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::Config;
use crate::ocr::engine::{EngineHealth, OcrEngine};
use crate::ocr::error::OcrError;
use crate::utils::{files, text};

/// Returned instead of an empty string when recognition finds nothing
pub const NO_TEXT_MESSAGE: &str = "No text could be extracted from the image.";

/// Configuration for the OCR service
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Temporary directory for preprocessed images
    pub temp_dir: String,
    pub default_language: String,
    pub concurrent_jobs: usize,
    pub timeout: Duration,
}

impl From<&Config> for OcrConfig {
    fn from(config: &Config) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            default_language: config.ocr_language.clone(),
            concurrent_jobs: config.concurrent_ocr_jobs,
            timeout: config.ocr_timeout(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OcrOutcome {
    /// Recognized text, or [`NO_TEXT_MESSAGE`] when nothing was found
    pub text: String,
    pub word_count: usize,
    pub has_text: bool,
    pub processing_time_ms: u64,
}

pub struct OcrService {
    engine: Arc<dyn OcrEngine>,
    temp_dir: PathBuf,
    default_language: String,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl OcrService {
    pub fn new(engine: Arc<dyn OcrEngine>, config: OcrConfig) -> Self {
        Self {
            engine,
            temp_dir: PathBuf::from(config.temp_dir),
            default_language: config.default_language,
            permits: Arc::new(Semaphore::new(config.concurrent_jobs.max(1))),
            timeout: config.timeout,
        }
    }

    /// Create the OCR service with the engine selected at compile time
    pub fn new_with_config(config: &Config) -> Self {
        #[cfg(feature = "ocr")]
        let engine: Arc<dyn OcrEngine> =
            Arc::new(engine::TesseractLibEngine::new(config.ocr_language.clone()));

        #[cfg(not(feature = "ocr"))]
        let engine: Arc<dyn OcrEngine> = Arc::new(engine::TesseractCliEngine::new());

        Self::new(engine, OcrConfig::from(config))
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub async fn health(&self) -> Result<EngineHealth, OcrError> {
        self.engine.health().await
    }

    /// Validate an uploaded image, preprocess it and run recognition.
    pub async fn extract_from_bytes(
        &self,
        filename: &str,
        content_type: &str,
        data: &[u8],
        lang: Option<&str>,
    ) -> Result<OcrOutcome, OcrError> {
        let started = Instant::now();
        let lang = lang.unwrap_or(self.default_language.as_str());

        if data.is_empty() {
            return Err(OcrError::InvalidImageFormat {
                details: "uploaded file is empty".to_string(),
            });
        }
        if !files::is_image_upload(filename, content_type) {
            return Err(OcrError::InvalidImageFormat {
                details: format!("unsupported file type '{}', please upload an image", content_type),
            });
        }
        if files::sniff_image_type(data).is_none() {
            return Err(OcrError::InvalidImageFormat {
                details: "file content is not a recognised image format".to_string(),
            });
        }
        health::validate_language_syntax(lang)?;

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| OcrError::RecognitionFailed {
                details: format!("OCR queue closed: {}", e),
            })?;

        let owned = data.to_vec();
        let temp_dir = self.temp_dir.clone();
        let prepared = tokio::task::spawn_blocking(move || preprocess::prepare_image(&owned, &temp_dir))
            .await
            .map_err(|e| OcrError::RecognitionFailed {
                details: format!("image preprocessing aborted: {}", e),
            })??;

        tracing::debug!(
            "Running {} on {} ({}x{}, lang={})",
            self.engine.name(),
            filename,
            prepared.width,
            prepared.height,
            lang
        );

        let recognition = self.engine.recognize(prepared.path(), lang, permit);
        let raw = tokio::time::timeout(self.timeout, recognition)
            .await
            .map_err(|_| OcrError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;
        drop(prepared);

        let cleaned = text::normalize_whitespace(&raw);
        let processing_time_ms = started.elapsed().as_millis() as u64;

        if cleaned.is_empty() {
            tracing::info!("No text found in {} ({}ms)", filename, processing_time_ms);
            return Ok(OcrOutcome {
                text: NO_TEXT_MESSAGE.to_string(),
                word_count: 0,
                has_text: false,
                processing_time_ms,
            });
        }

        let word_count = text::word_count(&cleaned);
        tracing::info!(
            "Extracted {} words from {} in {}ms",
            word_count,
            filename,
            processing_time_ms
        );

        Ok(OcrOutcome {
            text: cleaned,
            word_count,
            has_text: true,
            processing_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::path::Path;

    struct FixedEngine(&'static str);

    #[async_trait]
    impl OcrEngine for FixedEngine {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn recognize(
            &self,
            image_path: &Path,
            _lang: &str,
            _permit: OwnedSemaphorePermit,
        ) -> Result<String, OcrError> {
            assert!(image_path.exists(), "preprocessed image should exist during recognition");
            Ok(self.0.to_string())
        }

        async fn health(&self) -> Result<EngineHealth, OcrError> {
            Ok(EngineHealth::default())
        }
    }

    struct SlowEngine;

    #[async_trait]
    impl OcrEngine for SlowEngine {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn recognize(
            &self,
            _image_path: &Path,
            _lang: &str,
            _permit: OwnedSemaphorePermit,
        ) -> Result<String, OcrError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(String::new())
        }

        async fn health(&self) -> Result<EngineHealth, OcrError> {
            Ok(EngineHealth::default())
        }
    }

    /// Mimics libtesseract: uninterruptible work on the blocking pool.
    struct BlockingEngine(Duration);

    #[async_trait]
    impl OcrEngine for BlockingEngine {
        fn name(&self) -> &'static str {
            "blocking"
        }

        async fn recognize(
            &self,
            _image_path: &Path,
            _lang: &str,
            permit: OwnedSemaphorePermit,
        ) -> Result<String, OcrError> {
            let busy = self.0;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                std::thread::sleep(busy);
                Ok(String::new())
            })
            .await
            .map_err(|e| OcrError::RecognitionFailed { details: e.to_string() })?
        }

        async fn health(&self) -> Result<EngineHealth, OcrError> {
            Ok(EngineHealth::default())
        }
    }

    fn service(engine: Arc<dyn OcrEngine>, temp_dir: &Path, timeout: Duration) -> OcrService {
        OcrService::new(
            engine,
            OcrConfig {
                temp_dir: temp_dir.to_string_lossy().into_owned(),
                default_language: "eng".to_string(),
                concurrent_jobs: 1,
                timeout,
            },
        )
    }

    fn white_png() -> Vec<u8> {
        let img = RgbImage::from_pixel(120, 60, image::Rgb([255, 255, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_extract_normalizes_text_and_removes_temp_file() {
        let temp = tempfile::tempdir().unwrap();
        let ocr = service(Arc::new(FixedEngine("  Hello   World \n\n\n\nThis is a test ")), temp.path(), Duration::from_secs(5));

        let outcome = ocr.extract_from_bytes("test.png", "image/png", &white_png(), None).await.unwrap();
        assert_eq!(outcome.text, "Hello World\n\nThis is a test");
        assert_eq!(outcome.word_count, 6);
        assert!(outcome.has_text);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_blank_result_uses_no_text_message() {
        let temp = tempfile::tempdir().unwrap();
        let ocr = service(Arc::new(FixedEngine(" \n ")), temp.path(), Duration::from_secs(5));

        let outcome = ocr.extract_from_bytes("blank.jpg", "image/jpeg", &white_png(), None).await.unwrap();
        assert_eq!(outcome.text, NO_TEXT_MESSAGE);
        assert!(!outcome.has_text);
        assert_eq!(outcome.word_count, 0);
    }

    #[tokio::test]
    async fn test_rejects_text_files() {
        let temp = tempfile::tempdir().unwrap();
        let ocr = service(Arc::new(FixedEngine("unused")), temp.path(), Duration::from_secs(5));

        let err = ocr
            .extract_from_bytes("test.txt", "text/plain", b"This is not an image", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidImageFormat { .. }));

        // Declared as an image but the bytes say otherwise
        let err = ocr
            .extract_from_bytes("test.jpg", "image/jpeg", b"fake image data", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidImageFormat { .. }));
    }

    #[tokio::test]
    async fn test_rejects_malformed_language() {
        let temp = tempfile::tempdir().unwrap();
        let ocr = service(Arc::new(FixedEngine("unused")), temp.path(), Duration::from_secs(5));

        let err = ocr
            .extract_from_bytes("test.png", "image/png", &white_png(), Some("eng;ls"))
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::InvalidLanguage { .. }));
    }

    #[tokio::test]
    async fn test_slow_engine_times_out_and_cleans_up() {
        let temp = tempfile::tempdir().unwrap();
        let ocr = service(Arc::new(SlowEngine), temp.path(), Duration::from_millis(50));

        let err = ocr.extract_from_bytes("test.png", "image/png", &white_png(), None).await.unwrap_err();
        assert!(matches!(err, OcrError::Timeout { .. }));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_blocking_work_keeps_its_slot() {
        let temp = tempfile::tempdir().unwrap();
        let ocr = service(
            Arc::new(BlockingEngine(Duration::from_millis(500))),
            temp.path(),
            Duration::from_millis(50),
        );

        let err = ocr.extract_from_bytes("test.png", "image/png", &white_png(), None).await.unwrap_err();
        assert!(matches!(err, OcrError::Timeout { .. }));

        // The abandoned blocking call is still running and still counts against the limit
        assert_eq!(ocr.permits.available_permits(), 0);

        tokio::time::timeout(Duration::from_secs(5), async {
            while ocr.permits.available_permits() == 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("slot should be released once the blocking call returns");
        assert_eq!(ocr.permits.available_permits(), 1);
    }
}

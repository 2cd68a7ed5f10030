//! Text recognition engines
//!
//! `OcrService` talks to an engine through the `OcrEngine` trait so the HTTP
//! layer can be exercised without a tesseract installation.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tokio::sync::OwnedSemaphorePermit;

use crate::ocr::error::OcrError;
use crate::ocr::health::OcrHealthChecker;

#[cfg(feature = "ocr")]
use tesseract::Tesseract;

/// What an engine reports about itself on `/health`
#[derive(Debug, Clone, Default)]
pub struct EngineHealth {
    pub version: Option<String>,
    pub languages: Vec<String>,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short identifier reported on health endpoints
    fn name(&self) -> &'static str;

    /// Recognize the text in a preprocessed image on disk.
    ///
    /// `permit` is the caller's concurrency slot. Engines must keep it alive
    /// until their work has really stopped, including work that outlives a
    /// cancelled future.
    async fn recognize(
        &self,
        image_path: &Path,
        lang: &str,
        permit: OwnedSemaphorePermit,
    ) -> Result<String, OcrError>;

    async fn health(&self) -> Result<EngineHealth, OcrError>;
}

/// Runs the `tesseract` binary as a child process.
pub struct TesseractCliEngine {
    checker: OcrHealthChecker,
}

impl TesseractCliEngine {
    pub fn new() -> Self {
        Self {
            checker: OcrHealthChecker::new(),
        }
    }

    pub fn with_checker(checker: OcrHealthChecker) -> Self {
        Self { checker }
    }
}

impl Default for TesseractCliEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for TesseractCliEngine {
    fn name(&self) -> &'static str {
        "tesseract-cli"
    }

    async fn recognize(
        &self,
        image_path: &Path,
        lang: &str,
        _permit: OwnedSemaphorePermit,
    ) -> Result<String, OcrError> {
        self.checker.validate_language_combination(lang).await?;

        // The child is killed when this future is dropped, so the slot can go with it.
        // --psm 3: fully automatic page segmentation, the tesseract default
        let output = Command::new(self.checker.binary())
            .arg(image_path)
            .arg("stdout")
            .args(["-l", lang, "--psm", "3"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OcrError::TesseractNotInstalled
                } else {
                    OcrError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Failed loading language") {
                return Err(OcrError::LanguageNotInstalled { lang: lang.to_string() });
            }
            return Err(OcrError::RecognitionFailed {
                details: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn health(&self) -> Result<EngineHealth, OcrError> {
        let version = self.checker.check_tesseract_installation().await?;
        let languages = self.checker.installed_languages().await?;
        Ok(EngineHealth {
            version: Some(version),
            languages,
        })
    }
}

/// Links libtesseract directly; calls run on the blocking pool.
#[cfg(feature = "ocr")]
pub struct TesseractLibEngine {
    default_language: String,
}

#[cfg(feature = "ocr")]
impl TesseractLibEngine {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
        }
    }
}

#[cfg(feature = "ocr")]
#[async_trait]
impl OcrEngine for TesseractLibEngine {
    fn name(&self) -> &'static str {
        "tesseract-lib"
    }

    async fn recognize(
        &self,
        image_path: &Path,
        lang: &str,
        permit: OwnedSemaphorePermit,
    ) -> Result<String, OcrError> {
        crate::ocr::health::validate_language_syntax(lang)?;

        let path = image_path.to_string_lossy().into_owned();
        let lang = lang.to_string();

        // libtesseract cannot be interrupted; the slot stays taken until it returns
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut tesseract = Tesseract::new(None, Some(&lang))
                .map_err(|e| OcrError::InitializationFailed {
                    details: format!("{} (language '{}')", e, lang),
                })?
                .set_image(&path)
                .map_err(|e| OcrError::InvalidImageFormat {
                    details: e.to_string(),
                })?;

            tesseract.get_text().map_err(|e| OcrError::RecognitionFailed {
                details: format!("Failed to extract text: {}", e),
            })
        })
        .await
        .map_err(|e| OcrError::RecognitionFailed {
            details: format!("OCR task aborted: {}", e),
        })?
    }

    async fn health(&self) -> Result<EngineHealth, OcrError> {
        let lang = self.default_language.clone();
        let check_lang = lang.clone();
        tokio::task::spawn_blocking(move || {
            Tesseract::new(None, Some(&check_lang))
                .map(|_| ())
                .map_err(|e| OcrError::InitializationFailed { details: e.to_string() })
        })
        .await
        .map_err(|e| OcrError::InitializationFailed {
            details: format!("health check aborted: {}", e),
        })??;

        Ok(EngineHealth {
            version: None,
            languages: lang.split('+').map(str::to_string).collect(),
        })
    }
}

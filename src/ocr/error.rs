use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Tesseract is not installed or not on PATH. Install it with 'apt-get install tesseract-ocr' or 'brew install tesseract'")]
    TesseractNotInstalled,

    #[error("Invalid OCR language '{lang}': {details}")]
    InvalidLanguage { lang: String, details: String },

    #[error("Language pack '{lang}' is not installed")]
    LanguageNotInstalled { lang: String },

    #[error("Invalid image: {details}")]
    InvalidImageFormat { details: String },

    #[error("Image is too large to process ({width}x{height}, max {max_pixels} pixels)")]
    ImageTooLarge { width: u32, height: u32, max_pixels: u64 },

    #[error("OCR engine failed to initialize: {details}")]
    InitializationFailed { details: String },

    #[error("Text recognition failed: {details}")]
    RecognitionFailed { details: String },

    #[error("OCR timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OcrError::InvalidLanguage { .. }
            | OcrError::LanguageNotInstalled { .. }
            | OcrError::InvalidImageFormat { .. }
            | OcrError::ImageTooLarge { .. } => StatusCode::BAD_REQUEST,
            OcrError::TesseractNotInstalled
            | OcrError::InitializationFailed { .. }
            | OcrError::RecognitionFailed { .. }
            | OcrError::Timeout { .. }
            | OcrError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

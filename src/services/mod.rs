pub mod llm;
pub mod ocr_client;
pub mod transcription;
pub mod tts;
pub mod upstream;

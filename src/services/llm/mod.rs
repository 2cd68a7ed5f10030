pub mod llm_service;
pub mod ollama;
pub mod prompts;

pub use llm_service::{GeneratedContent, LlmService};
pub use ollama::OllamaClient;

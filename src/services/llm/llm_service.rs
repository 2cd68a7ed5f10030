use serde_json::Value;

use crate::config::Config;
use crate::error::UpstreamError;
use crate::models::{ContentType, DependencyHealth, QuizType};
use crate::services::llm::ollama::OllamaClient;
use crate::services::llm::prompts;
use crate::utils::json::parse_json_array;
use crate::utils::text::truncate_chars;

/// Study material produced by `generate_content`; sections not requested stay `None`.
#[derive(Debug, Default)]
pub struct GeneratedContent {
    pub summary: Option<String>,
    pub flashcards: Option<Vec<Value>>,
    pub quiz: Option<Vec<Value>>,
}

#[derive(Clone)]
pub struct LlmService {
    client: OllamaClient,
    max_input_chars: usize,
}

impl LlmService {
    pub fn new(client: OllamaClient, max_input_chars: usize) -> Self {
        Self {
            client,
            max_input_chars,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self::new(OllamaClient::from_config(config)?, config.llm_max_input_chars))
    }

    pub async fn health(&self) -> DependencyHealth {
        self.client.health().await
    }

    pub async fn generate_quiz(&self, text: &str, quiz_type: QuizType) -> Result<Vec<Value>, UpstreamError> {
        let prompt = prompts::quiz_prompt(self.clip(text), quiz_type);
        let raw = self.client.generate(&prompt).await?;
        let quiz = parse_json_array(&raw);
        if quiz.is_empty() {
            tracing::warn!(
                "Model {} returned no parseable {} quiz ({} chars of output)",
                self.client.model(),
                quiz_type,
                raw.len()
            );
        }
        Ok(quiz)
    }

    pub async fn generate_flashcards(&self, text: &str) -> Result<Vec<Value>, UpstreamError> {
        let raw = self.client.generate(&prompts::flashcards_prompt(self.clip(text))).await?;
        let cards = parse_json_array(&raw);
        if cards.is_empty() {
            tracing::warn!("Model {} returned no parseable flashcards", self.client.model());
        }
        Ok(cards)
    }

    pub async fn summarize(&self, text: &str) -> Result<String, UpstreamError> {
        let raw = self.client.generate(&prompts::summary_prompt(self.clip(text))).await?;
        Ok(raw.trim().to_string())
    }

    /// Generate the requested sections; `All` runs the three requests concurrently.
    pub async fn generate_content(
        &self,
        text: &str,
        content_type: ContentType,
    ) -> Result<GeneratedContent, UpstreamError> {
        let summary = async {
            if content_type.includes_summary() {
                self.summarize(text).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let flashcards = async {
            if content_type.includes_flashcards() {
                self.generate_flashcards(text).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let quiz = async {
            if content_type.includes_quiz() {
                self.generate_quiz(text, QuizType::All).await.map(Some)
            } else {
                Ok(None)
            }
        };

        let (summary, flashcards, quiz) = tokio::try_join!(summary, flashcards, quiz)?;
        Ok(GeneratedContent {
            summary,
            flashcards,
            quiz,
        })
    }

    fn clip<'a>(&self, text: &'a str) -> &'a str {
        let clipped = truncate_chars(text.trim(), self.max_input_chars);
        if clipped.len() < text.trim().len() {
            tracing::debug!("Truncated LLM input to {} characters", self.max_input_chars);
        }
        clipped
    }
}

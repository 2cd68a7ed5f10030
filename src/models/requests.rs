use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Kind of quiz questions the LLM is asked to produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuizType {
    MultipleChoice,
    ShortAnswer,
    TrueFalse,
    #[default]
    All,
}

impl fmt::Display for QuizType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizType::MultipleChoice => write!(f, "multiple_choice"),
            QuizType::ShortAnswer => write!(f, "short_answer"),
            QuizType::TrueFalse => write!(f, "true_false"),
            QuizType::All => write!(f, "all"),
        }
    }
}

/// Which study materials `/api/generate-content` should produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Summary,
    Flashcards,
    Quiz,
    #[default]
    All,
}

impl ContentType {
    pub fn includes_summary(self) -> bool {
        matches!(self, ContentType::Summary | ContentType::All)
    }

    pub fn includes_flashcards(self) -> bool {
        matches!(self, ContentType::Flashcards | ContentType::All)
    }

    pub fn includes_quiz(self) -> bool {
        matches!(self, ContentType::Quiz | ContentType::All)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Summary => write!(f, "summary"),
            ContentType::Flashcards => write!(f, "flashcards"),
            ContentType::Quiz => write!(f, "quiz"),
            ContentType::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizRequest {
    pub text: String,
    #[serde(default)]
    pub quiz_type: QuizType,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentRequest {
    pub text: String,
    #[serde(default)]
    pub content_type: ContentType,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpeechRequest {
    pub text: String,
    /// Engine-specific voice name; falls back to `TTS_VOICE`
    #[serde(default)]
    pub voice: Option<String>,
}

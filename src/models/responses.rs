use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::QuizType;

/// Text recognised from an uploaded image
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExtractResponse {
    pub success: bool,
    pub text: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranscriptionResponse {
    pub success: bool,
    pub text: String,
    pub filename: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizResponse {
    pub success: bool,
    pub quiz_type: QuizType,
    #[schema(value_type = Vec<Object>)]
    pub quiz: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ContentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub flashcards: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub quiz: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpeechResponse {
    pub success: bool,
    /// Base64-encoded audio
    pub audio: String,
    pub content_type: String,
    pub engine: String,
}

/// Health of one downstream dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DependencyHealth {
    pub status: DependencyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    Healthy,
    Unhealthy,
    Unreachable,
}

impl DependencyHealth {
    pub fn healthy() -> Self {
        Self { status: DependencyStatus::Healthy, details: None }
    }

    pub fn unhealthy(details: impl Into<String>) -> Self {
        Self { status: DependencyStatus::Unhealthy, details: Some(details.into()) }
    }

    pub fn unreachable(details: impl Into<String>) -> Self {
        Self { status: DependencyStatus::Unreachable, details: Some(details.into()) }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == DependencyStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServicesHealth {
    pub ocr: DependencyHealth,
    pub llm: DependencyHealth,
}

/// Aggregated `/health` body for the gateway and the backend
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` when every dependency is, otherwise `degraded`
    pub status: String,
    pub services: ServicesHealth,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn from_services(services: ServicesHealth) -> Self {
        let status = if services.ocr.is_healthy() && services.llm.is_healthy() {
            "healthy"
        } else {
            "degraded"
        };
        Self {
            status: status.to_string(),
            services,
            timestamp: Utc::now(),
        }
    }
}

/// `/health` body of the OCR microservice
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OcrHealthResponse {
    pub status: String,
    pub engine: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
}

/// Banner served by the backend at `/`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub version: String,
}

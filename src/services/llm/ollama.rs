use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::error::UpstreamError;
use crate::models::DependencyHealth;
use crate::services::upstream::{classify_request_error, status_error};

const SERVICE: &str = "ollama";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Minimal client for Ollama's non-streaming `/api/generate`.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            temperature,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.ollama_url.clone(),
            config.ollama_model.clone(),
            config.llm_temperature,
            config.llm_timeout(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_request_error(SERVICE, self.timeout, &e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                classify_request_error(SERVICE, self.timeout, &e)
            } else {
                UpstreamError::InvalidResponse {
                    service: SERVICE,
                    details: e.to_string(),
                }
            }
        })?;

        tracing::debug!("Ollama ({}) returned {} characters", self.model, parsed.response.len());
        Ok(parsed.response)
    }

    /// Ollama is healthy when it answers `/api/tags`; a missing model is reported
    /// as unhealthy so misconfiguration shows up on `/health`.
    pub async fn health(&self) -> DependencyHealth {
        let url = format!("{}/api/tags", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                return DependencyHealth::unreachable(classify_request_error(SERVICE, self.timeout, &e).to_string());
            }
        };

        if !response.status().is_success() {
            return DependencyHealth::unhealthy(format!("HTTP {}", response.status().as_u16()));
        }

        // Older Ollama builds and proxies may not return a model list
        let Ok(tags) = response.json::<TagsResponse>().await else {
            return DependencyHealth::healthy();
        };
        if tags.models.is_empty() || tags.models.iter().any(|m| model_matches(&m.name, &self.model)) {
            DependencyHealth::healthy()
        } else {
            DependencyHealth::unhealthy(format!("model '{}' is not pulled", self.model))
        }
    }
}

/// `llama3.2` matches `llama3.2:latest`
fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted || installed.split(':').next() == Some(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_matches() {
        assert!(model_matches("llama3.2:latest", "llama3.2"));
        assert!(model_matches("llama3.2:3b", "llama3.2:3b"));
        assert!(!model_matches("mistral:latest", "llama3.2"));
    }

    #[test]
    fn test_generate_request_shape() {
        let body = GenerateRequest {
            model: "llama3.2",
            prompt: "Say hi",
            stream: false,
            options: GenerateOptions { temperature: 0.5 },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "llama3.2");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["temperature"], 0.5);
    }
}

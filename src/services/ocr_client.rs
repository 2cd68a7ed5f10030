use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use crate::error::UpstreamError;
use crate::extract::UploadedFile;
use crate::models::{DependencyHealth, ExtractResponse};
use crate::services::upstream::{classify_request_error, status_error};

const SERVICE: &str = "ocr-service";

#[derive(Debug, Deserialize)]
struct RemoteHealth {
    status: String,
    #[serde(default)]
    details: Option<String>,
}

/// Client the gateway uses to reach the OCR microservice.
#[derive(Clone)]
pub struct OcrClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OcrClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    /// Forward an uploaded image to `POST /extract`, with an optional tesseract language.
    pub async fn extract(&self, file: &UploadedFile, lang: Option<&str>) -> Result<ExtractResponse, UpstreamError> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| UpstreamError::InvalidResponse {
                service: SERVICE,
                details: format!("invalid content type '{}': {}", file.content_type, e),
            })?;
        let mut form = Form::new().part("file", part);
        if let Some(lang) = lang {
            form = form.text("lang", lang.to_string());
        }

        let url = format!("{}/extract", self.base_url);
        tracing::debug!("Forwarding {} ({} bytes) to {}", file.filename, file.data.len(), url);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_request_error(SERVICE, self.timeout, &e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        response
            .json::<ExtractResponse>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse {
                service: SERVICE,
                details: e.to_string(),
            })
    }

    /// Healthy only when the service answers 2xx and reports `"status": "healthy"`.
    pub async fn health(&self) -> DependencyHealth {
        let url = format!("{}/health", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("OCR service health check failed: {}", e);
                return DependencyHealth::unreachable(classify_request_error(SERVICE, self.timeout, &e).to_string());
            }
        };

        if !response.status().is_success() {
            return DependencyHealth::unhealthy(format!("HTTP {}", response.status().as_u16()));
        }

        match response.json::<RemoteHealth>().await {
            Ok(body) if body.status == "healthy" => DependencyHealth::healthy(),
            Ok(body) => DependencyHealth::unhealthy(match body.details {
                Some(details) => format!("OCR service is {}: {}", body.status, details),
                None => format!("OCR service is {}", body.status),
            }),
            Err(e) => DependencyHealth::unhealthy(format!("unreadable health response: {}", e)),
        }
    }
}

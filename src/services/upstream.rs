use std::time::Duration;

use crate::error::UpstreamError;

/// Map a reqwest transport failure onto the upstream error taxonomy.
pub fn classify_request_error(service: &'static str, timeout: Duration, error: &reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Timeout {
            service,
            seconds: timeout.as_secs(),
        }
    } else if error.is_connect() {
        UpstreamError::Unavailable {
            service,
            details: error.to_string(),
        }
    } else if error.is_decode() || error.is_body() {
        UpstreamError::InvalidResponse {
            service,
            details: error.to_string(),
        }
    } else if let Some(status) = error.status() {
        UpstreamError::Status {
            service,
            status: status.as_u16(),
            body: error.to_string(),
        }
    } else {
        classify_by_message(service, timeout, error.to_string())
    }
}

/// Fallback for errors reqwest did not categorise (DNS, TLS, redirect loops)
fn classify_by_message(service: &'static str, timeout: Duration, message: String) -> UpstreamError {
    let lower = message.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        UpstreamError::Timeout {
            service,
            seconds: timeout.as_secs(),
        }
    } else if lower.contains("dns")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("failed to lookup")
        || lower.contains("tcp connect")
    {
        UpstreamError::Unavailable { service, details: message }
    } else {
        UpstreamError::InvalidResponse { service, details: message }
    }
}

/// Turn a non-2xx response into an `UpstreamError::Status`, keeping a bounded
/// slice of the body for diagnostics.
pub async fn status_error(service: &'static str, response: reqwest::Response) -> UpstreamError {
    const MAX_BODY: usize = 512;

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let body = crate::utils::text::truncate_chars(body.trim(), MAX_BODY).to_string();

    UpstreamError::Status { service, status, body }
}

/// Pull FastAPI/axum style `detail` (or `error`) out of an error body.
pub fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .or_else(|| value.get("error"))
                .and_then(|d| d.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_message() {
        let timeout = Duration::from_secs(30);
        assert!(matches!(
            classify_by_message("ollama", timeout, "operation timed out".to_string()),
            UpstreamError::Timeout { seconds: 30, .. }
        ));
        assert!(matches!(
            classify_by_message("ollama", timeout, "dns error: failed to lookup address".to_string()),
            UpstreamError::Unavailable { .. }
        ));
        assert!(matches!(
            classify_by_message("ollama", timeout, "builder error".to_string()),
            UpstreamError::InvalidResponse { .. }
        ));
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(error_detail(r#"{"detail": "File must be an image"}"#), "File must be an image");
        assert_eq!(error_detail(r#"{"success": false, "error": "bad"}"#), "bad");
        assert_eq!(error_detail("plain failure"), "plain failure");
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        // Port 9 (discard) is essentially never listening on loopback
        let timeout = Duration::from_secs(2);
        let client = reqwest::Client::builder().timeout(timeout).build().unwrap();
        let err = client.get("http://127.0.0.1:9/health").send().await.unwrap_err();

        let classified = classify_request_error("ocr-service", timeout, &err);
        assert!(matches!(classified, UpstreamError::Unavailable { service: "ocr-service", .. }));
    }
}

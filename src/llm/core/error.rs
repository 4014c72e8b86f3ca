//! Error types for the LLM layer

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when using LLM providers
#[derive(Debug, Error)]
pub enum LlmError {
    /// Authentication/token issues
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// HTTP request failures
    #[error("HTTP error (status {status}): {body}")]
    HttpError { status: u16, body: String },

    /// SSE stream parsing failures
    #[error("Stream error: {0}")]
    StreamError(String),

    /// JSON encoding/decoding issues
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded (retry after {retry_after:?})")]
    RateLimitExceeded { retry_after: Option<Duration> },
}

impl LlmError {
    /// Whether the provider asked us to slow down
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimitExceeded { .. } | LlmError::HttpError { status: 429, .. }
        )
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::HttpError {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            body: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = LlmError::HttpError {
            status: 404,
            body: "Not found".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("Not found"));
    }

    #[test]
    fn test_rate_limit_detection() {
        let err = LlmError::RateLimitExceeded {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert!(err.to_string().contains("Rate limit exceeded"));
        assert!(err.is_rate_limited());

        let too_many = LlmError::HttpError {
            status: 429,
            body: String::new(),
        };
        assert!(too_many.is_rate_limited());

        let other = LlmError::StreamError("closed".to_string());
        assert!(!other.is_rate_limited());
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let llm_err: LlmError = json_err.into();
        assert!(matches!(llm_err, LlmError::SerializationError(_)));
    }
}

//! Gemini client implementation

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::llm::auth::AdcTokenSource;
use crate::llm::core::{
    error::LlmError,
    provider::{LlmProvider, LlmStream},
    types::GenerateRequest,
};

use super::mapper::{create_message_start, from_gemini_response, to_gemini_request};
use super::sse::parse_sse_stream;

const DEVELOPER_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini model identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiModel {
    Gemini20Flash,
    Gemini25Pro,
    Gemini25Flash,
    Gemini25FlashLite,
    /// Any other published model id
    Custom(String),
}

impl GeminiModel {
    /// Get the model identifier string
    pub fn as_str(&self) -> &str {
        match self {
            GeminiModel::Gemini20Flash => "gemini-2.0-flash",
            GeminiModel::Gemini25Pro => "gemini-2.5-pro",
            GeminiModel::Gemini25Flash => "gemini-2.5-flash",
            GeminiModel::Gemini25FlashLite => "gemini-2.5-flash-lite",
            GeminiModel::Custom(id) => id,
        }
    }
}

impl FromStr for GeminiModel {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the "models/" prefix used by the Developer API listings
        let id = s.trim().trim_start_matches("models/");
        Ok(match id {
            "" => {
                return Err(LlmError::InvalidRequest(
                    "model identifier must not be empty".to_string(),
                ))
            }
            "gemini-2.0-flash" => GeminiModel::Gemini20Flash,
            "gemini-2.5-pro" => GeminiModel::Gemini25Pro,
            "gemini-2.5-flash" => GeminiModel::Gemini25Flash,
            "gemini-2.5-flash-lite" => GeminiModel::Gemini25FlashLite,
            other => GeminiModel::Custom(other.to_string()),
        })
    }
}

impl fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where Gemini is served from
#[derive(Clone, PartialEq, Eq)]
pub enum GeminiBackend {
    /// Vertex AI, authenticated with Application Default Credentials
    VertexAi { project_id: String, location: String },
    /// Gemini Developer API, authenticated with an API key
    DeveloperApi { api_key: String },
}

impl fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeminiBackend::VertexAi {
                project_id,
                location,
            } => f
                .debug_struct("VertexAi")
                .field("project_id", project_id)
                .field("location", location)
                .finish(),
            GeminiBackend::DeveloperApi { .. } => f
                .debug_struct("DeveloperApi")
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

enum Credentials {
    Adc(AdcTokenSource),
    ApiKey(String),
}

/// Client for Gemini models
pub struct GeminiClient {
    http_client: Client,
    credentials: Credentials,
    endpoint: String,
    model: GeminiModel,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or, for Vertex AI,
    /// if no Application Default Credentials are available.
    pub async fn new(model: GeminiModel, backend: GeminiBackend) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LlmError::HttpError {
                status: 0,
                body: format!("Failed to create HTTP client: {}", e),
            })?;

        let endpoint = build_endpoint_url(&backend, &model);
        let credentials = match backend {
            GeminiBackend::VertexAi { .. } => Credentials::Adc(AdcTokenSource::discover().await?),
            GeminiBackend::DeveloperApi { api_key } => Credentials::ApiKey(api_key),
        };

        Ok(Self {
            http_client,
            credentials,
            endpoint,
            model,
        })
    }

    pub fn model(&self) -> &GeminiModel {
        &self.model
    }

    async fn make_streaming_request(&self, request: GenerateRequest) -> Result<LlmStream, LlmError> {
        let gemini_request = to_gemini_request(request);

        let mut builder = self.http_client.post(&self.endpoint).json(&gemini_request);
        builder = match &self.credentials {
            Credentials::Adc(source) => builder.header("Authorization", source.bearer_header().await?),
            Credentials::ApiKey(key) => builder.header("x-goog-api-key", key),
        };

        tracing::debug!(model = %self.model, "Sending Gemini streaming request");
        let response = builder.send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            tracing::warn!(model = %self.model, ?retry_after, "Gemini rate limit hit");
            return Err(LlmError::RateLimitExceeded { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let sse_stream = parse_sse_stream(Box::pin(response.bytes_stream()));

        let message_id = Uuid::new_v4().to_string();
        let mut emitted_start = false;
        let mut current_index = 0;

        let events = sse_stream.flat_map(move |chunk| {
            let batch = match chunk {
                Ok(gemini_response) => {
                    let mut batch = Vec::new();
                    if !emitted_start {
                        batch.push(Ok(create_message_start(message_id.clone())));
                        emitted_start = true;
                    }
                    batch.extend(
                        from_gemini_response(gemini_response, &mut current_index)
                            .into_iter()
                            .map(Ok),
                    );
                    batch
                }
                Err(e) => vec![Err(e)],
            };
            futures::stream::iter(batch)
        });

        Ok(Box::pin(events))
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<LlmStream, LlmError> {
        self.make_streaming_request(request).await
    }
}

fn build_endpoint_url(backend: &GeminiBackend, model: &GeminiModel) -> String {
    match backend {
        GeminiBackend::VertexAi {
            project_id,
            location,
        } => format!(
            "https://{location}-aiplatform.googleapis.com/v1/projects/{project_id}/locations/{location}/publishers/google/models/{}:streamGenerateContent?alt=sse",
            model.as_str()
        ),
        GeminiBackend::DeveloperApi { .. } => format!(
            "{DEVELOPER_API_BASE}/models/{}:streamGenerateContent?alt=sse",
            model.as_str()
        ),
    }
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

//! Provider trait for LLM implementations

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

use super::{
    error::LlmError,
    types::{GenerateRequest, StreamEvent},
};
use crate::llm::gemini::{GeminiBackend, GeminiClient, GeminiModel};

/// Stream of incremental generation events
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Main interface that all LLM provider implementations must satisfy
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stream generate content from the LLM
    ///
    /// Sends a request to the model and returns a stream of events
    /// representing the incremental response.
    async fn stream_generate(&self, request: GenerateRequest) -> Result<LlmStream, LlmError>;
}

/// Create a Gemini provider for `model` on the given backend
///
/// # Example
///
/// ```rust,no_run
/// use weather_agent::llm::{create_provider, GeminiBackend, GeminiModel};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = create_provider(
///     GeminiModel::Gemini20Flash,
///     GeminiBackend::DeveloperApi { api_key: "key".to_string() },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn create_provider(
    model: GeminiModel,
    backend: GeminiBackend,
) -> Result<Box<dyn LlmProvider>, LlmError> {
    let client = GeminiClient::new(model, backend).await?;
    Ok(Box::new(client))
}

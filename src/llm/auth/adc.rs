//! Application Default Credentials (ADC) token source

use gcp_auth::AuthenticationManager;

use crate::llm::core::error::LlmError;

/// OAuth scope required by Vertex AI
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Bearer tokens for Vertex AI, discovered through the standard ADC flow
///
/// Credentials come from `GOOGLE_APPLICATION_CREDENTIALS`, the gcloud user
/// credentials file, or the metadata server. Tokens are cached and refreshed
/// by `gcp_auth`.
pub struct AdcTokenSource {
    manager: AuthenticationManager,
}

impl AdcTokenSource {
    /// Discover credentials
    ///
    /// # Errors
    /// Returns an error if no valid credentials can be found.
    pub async fn discover() -> Result<Self, LlmError> {
        let manager = AuthenticationManager::new()
            .await
            .map_err(|e| LlmError::AuthenticationError(format!("Failed to initialize ADC: {}", e)))?;

        Ok(Self { manager })
    }

    /// `Authorization` header value for the next request
    pub async fn bearer_header(&self) -> Result<String, LlmError> {
        let token = self
            .manager
            .get_token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| LlmError::AuthenticationError(format!("Failed to get token: {}", e)))?;

        Ok(format!("Bearer {}", token.as_str()))
    }
}

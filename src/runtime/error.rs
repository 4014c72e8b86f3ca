use std::time::Duration;

use crate::llm::agent::AgentError;
use crate::llm::core::error::LlmError;

/// Errors surfaced by an [`AgentRuntime`](super::AgentRuntime)
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The model provider asked us to back off
    #[error("Rate limited by the model provider (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Session not found: app={app_name}, user={user_id}, session={session_id}")]
    SessionNotFound {
        app_name: String,
        user_id: String,
        session_id: String,
    },

    #[error("Session already exists: app={app_name}, user={user_id}, session={session_id}")]
    SessionAlreadyExists {
        app_name: String,
        user_id: String,
        session_id: String,
    },

    #[error("Agent error: {0}")]
    Agent(#[source] AgentError),
}

impl RuntimeError {
    /// Suggested wait before retrying, when the provider gave one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RuntimeError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<AgentError> for RuntimeError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Llm(LlmError::RateLimitExceeded { retry_after }) => {
                RuntimeError::RateLimited { retry_after }
            }
            AgentError::Llm(LlmError::HttpError { status: 429, .. }) => {
                RuntimeError::RateLimited { retry_after: None }
            }
            other => RuntimeError::Agent(other),
        }
    }
}

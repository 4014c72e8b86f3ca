//! Drives a conversation one turn at a time
//!
//! A turn sends one user message to an [`AgentRuntime`] and reads its events
//! until the first final one:
//!
//! ```text
//! Sent -> Draining -> FinalFound | Exhausted
//! ```
//!
//! Nothing after the final event is pulled from the stream.

mod context;
mod rate_limit;

pub use context::ConversationContext;
pub use rate_limit::is_rate_limit_error;

use futures::StreamExt;

use crate::llm::core::types::Message;
use crate::runtime::{AgentRuntime, ConversationEvent, RuntimeError};

/// Answer used when a turn ends without a usable final event
pub const NO_FINAL_RESPONSE: &str = "Agent did not produce a final response.";

/// Escalation text used when the runtime gave no reason
pub const NO_ESCALATION_MESSAGE: &str = "No specific message.";

/// Send `query` and return the text of the turn's final event
///
/// # Errors
///
/// Runtime errors are returned as-is; the driver neither classifies nor
/// retries them.
pub async fn run_turn(
    query: &str,
    runtime: &dyn AgentRuntime,
    user_id: &str,
    session_id: &str,
) -> Result<String, RuntimeError> {
    tracing::info!(query, user_id, session_id, "Agent interaction started");

    let mut events = runtime
        .run_async(user_id, session_id, Message::user(query))
        .await?;

    let mut answer = NO_FINAL_RESPONSE.to_string();
    while let Some(event) = events.next().await {
        let event = event?;
        tracing::trace!(author = %event.author, is_final = event.is_final_response(), "Event");

        if event.is_final_response() {
            answer = resolve_final_event(&event);
            break;
        }
    }

    tracing::info!(response = %answer, "Agent response");
    Ok(answer)
}

/// Text of a final event: its first text part, else its escalation
fn resolve_final_event(event: &ConversationEvent) -> String {
    if let Some(text) = event.content.as_ref().and_then(|c| c.first_text()) {
        return text.to_string();
    }
    if event.is_escalation() {
        return format!(
            "Agent escalated: {}",
            event.error_message.as_deref().unwrap_or(NO_ESCALATION_MESSAGE)
        );
    }
    NO_FINAL_RESPONSE.to_string()
}

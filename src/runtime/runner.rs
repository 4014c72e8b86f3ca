//! Runs an agent against stored sessions

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

use super::error::RuntimeError;
use super::event::ConversationEvent;
use super::session::{InMemorySessionService, Session};
use super::{AgentRuntime, EventStream};
use crate::llm::agent::{Agent, AgentError, AgentEvent};
use crate::llm::core::types::{ContentBlock, FinishReason, Message};

/// Binds one agent to a session service
///
/// Each call to [`run_async`](AgentRuntime::run_async) is one turn: the
/// session is locked, the agent loop runs over the session's history, and the
/// loop's progress is reported as [`ConversationEvent`]s ending in exactly
/// one final event. Every event is also appended to the session.
pub struct Runner {
    agent: Agent,
    app_name: String,
    session_service: Arc<InMemorySessionService>,
}

impl Runner {
    pub fn new(
        agent: Agent,
        app_name: impl Into<String>,
        session_service: Arc<InMemorySessionService>,
    ) -> Self {
        Self {
            agent,
            app_name: app_name.into(),
            session_service,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn session_service(&self) -> &Arc<InMemorySessionService> {
        &self.session_service
    }
}

#[async_trait]
impl AgentRuntime for Runner {
    async fn run_async<'a>(
        &'a self,
        user_id: &str,
        session_id: &str,
        new_message: Message,
    ) -> Result<EventStream<'a>, RuntimeError> {
        let session = self
            .session_service
            .get_session(&self.app_name, user_id, session_id)
            .await?;
        let invocation_id = format!("e-{}", Uuid::new_v4());
        tracing::debug!(%invocation_id, user_id, session_id, "Starting turn");

        Ok(Box::pin(stream! {
            let mut guard = session.lock_owned().await;
            let Session { messages, events, last_update_time, .. } = &mut *guard;
            let author = self.agent.name();

            let opening = ConversationEvent::user_message(&invocation_id, new_message.clone());
            record_event(events, last_update_time, opening);

            let mut agent_events = self.agent.run(messages, new_message);
            while let Some(agent_event) = agent_events.next().await {
                let event = match agent_event {
                    Ok(agent_event) => match to_conversation_event(&invocation_id, author, agent_event) {
                        Some(event) => event,
                        None => continue,
                    },
                    Err(AgentError::MaxIterationsReached(limit)) => {
                        tracing::warn!(%invocation_id, limit, "Agent hit its iteration limit");
                        ConversationEvent::escalation(
                            &invocation_id,
                            author,
                            Some(format!(
                                "Agent stopped after {} model calls without a final response.",
                                limit
                            )),
                        )
                    }
                    Err(e) => {
                        tracing::error!(%invocation_id, error = %e, "Turn failed");
                        yield Err(RuntimeError::from(e));
                        return;
                    }
                };

                let is_final = event.is_final_response();
                record_event(events, last_update_time, event.clone());
                yield Ok(event);

                if is_final {
                    return;
                }
            }
        }))
    }
}

/// Append to the session log and move its update time to the event's
fn record_event(
    events: &mut Vec<ConversationEvent>,
    last_update_time: &mut DateTime<Utc>,
    event: ConversationEvent,
) {
    *last_update_time = event.timestamp;
    events.push(event);
}

/// Map one agent-loop event; `None` for events with no conversation meaning
fn to_conversation_event(
    invocation_id: &str,
    author: &str,
    event: AgentEvent,
) -> Option<ConversationEvent> {
    match event {
        AgentEvent::IterationStarted { iteration } => {
            tracing::debug!(invocation_id, iteration, "Calling model");
            None
        }
        AgentEvent::LlmEvent(_) => None,
        AgentEvent::ToolExecutionStarted {
            tool_use_id,
            name,
            input,
        } => Some(ConversationEvent::tool_call(
            invocation_id,
            author,
            tool_use_id,
            name,
            input,
        )),
        AgentEvent::ToolExecutionCompleted {
            tool_use_id,
            name,
            result,
        } => Some(ConversationEvent::tool_response(
            invocation_id,
            author,
            ContentBlock::tool_result(tool_use_id, name, result),
        )),
        AgentEvent::ToolExecutionFailed {
            tool_use_id,
            name,
            error,
        } => {
            tracing::warn!(invocation_id, tool = %name, %error, "Tool call failed");
            Some(ConversationEvent::tool_response(
                invocation_id,
                author,
                ContentBlock::tool_error(tool_use_id, name, error),
            ))
        }
        AgentEvent::Completed {
            text,
            finish_reason,
        } => Some(final_event(invocation_id, author, text, finish_reason)),
    }
}

fn final_event(
    invocation_id: &str,
    author: &str,
    text: String,
    finish_reason: FinishReason,
) -> ConversationEvent {
    if !text.trim().is_empty() {
        return ConversationEvent::final_text(invocation_id, author, text);
    }

    match finish_reason {
        FinishReason::Safety => ConversationEvent::escalation(
            invocation_id,
            author,
            Some("Response blocked by safety filters.".to_string()),
        ),
        FinishReason::Recitation => ConversationEvent::escalation(
            invocation_id,
            author,
            Some("Response blocked for reciting training data.".to_string()),
        ),
        _ => ConversationEvent::final_without_content(invocation_id, author),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_event_prefers_text() {
        let event = final_event("inv", "agent", "Sunny".to_string(), FinishReason::Safety);
        assert!(event.is_final_response());
        assert!(!event.is_escalation());
        assert_eq!(event.content.unwrap().first_text(), Some("Sunny"));
    }

    #[test]
    fn test_blocked_reply_escalates() {
        let event = final_event("inv", "agent", String::new(), FinishReason::Safety);
        assert!(event.is_escalation());
        assert!(event.error_message.unwrap().contains("safety"));

        let event = final_event("inv", "agent", "  ".to_string(), FinishReason::Recitation);
        assert!(event.is_escalation());
    }

    #[test]
    fn test_empty_reply_is_final_without_content() {
        let event = final_event("inv", "agent", String::new(), FinishReason::MaxTokens);
        assert!(event.is_final_response());
        assert!(event.content.is_none());
        assert!(!event.is_escalation());
    }

    #[test]
    fn test_record_event_moves_update_time() {
        let mut events = Vec::new();
        let mut last_update_time = DateTime::<Utc>::MIN_UTC;
        let event = ConversationEvent::final_text("inv", "agent", "done");
        let timestamp = event.timestamp;

        record_event(&mut events, &mut last_update_time, event);

        assert_eq!(events.len(), 1);
        assert_eq!(last_update_time, timestamp);
    }

    #[test]
    fn test_stream_plumbing_events_are_dropped() {
        assert!(to_conversation_event("inv", "agent", AgentEvent::IterationStarted { iteration: 1 })
            .is_none());
    }

    #[test]
    fn test_tool_failure_becomes_error_response() {
        let event = to_conversation_event(
            "inv",
            "agent",
            AgentEvent::ToolExecutionFailed {
                tool_use_id: "call-1".to_string(),
                name: "get_weather".to_string(),
                error: "bad args".to_string(),
            },
        )
        .unwrap();
        assert!(!event.is_final_response());
        assert!(matches!(
            &event.content.unwrap().content[0],
            ContentBlock::ToolResult { is_error: true, .. }
        ));
    }
}

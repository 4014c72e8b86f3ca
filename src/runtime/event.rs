//! Events produced by the runner during a turn

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::core::types::{ContentBlock, Message, MessageRole};

/// Side effects requested by an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventActions {
    /// The agent gave up and is surfacing an error instead of an answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalate: Option<bool>,
}

/// One step of a conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEvent {
    pub id: String,
    /// Shared by every event of one turn
    pub invocation_id: String,
    /// "user" or the agent's name
    pub author: String,
    pub content: Option<Message>,
    #[serde(default)]
    pub actions: EventActions,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
    is_final: bool,
}

impl ConversationEvent {
    fn new(invocation_id: &str, author: &str, content: Option<Message>, is_final: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            invocation_id: invocation_id.to_string(),
            author: author.to_string(),
            content,
            actions: EventActions::default(),
            error_message: None,
            timestamp: Utc::now(),
            is_final,
        }
    }

    /// The user's message that opens a turn
    pub fn user_message(invocation_id: &str, message: Message) -> Self {
        Self::new(invocation_id, "user", Some(message), false)
    }

    /// The model asking for a tool
    pub fn tool_call(
        invocation_id: &str,
        author: &str,
        tool_use_id: String,
        name: String,
        input: serde_json::Value,
    ) -> Self {
        let content = Message {
            role: MessageRole::Assistant,
            content: vec![ContentBlock::ToolUse {
                id: tool_use_id,
                name,
                input,
                signature: None,
            }],
        };
        Self::new(invocation_id, author, Some(content), false)
    }

    /// A tool's answer
    pub fn tool_response(invocation_id: &str, author: &str, result: ContentBlock) -> Self {
        Self::new(
            invocation_id,
            author,
            Some(Message::tool_results(vec![result])),
            false,
        )
    }

    /// The concluding answer of a turn
    pub fn final_text(invocation_id: &str, author: &str, text: impl Into<String>) -> Self {
        Self::new(
            invocation_id,
            author,
            Some(Message::assistant(text)),
            true,
        )
    }

    /// The concluding event of a turn whose model reply was empty
    pub fn final_without_content(invocation_id: &str, author: &str) -> Self {
        Self::new(invocation_id, author, None, true)
    }

    /// The concluding event of a turn that has no answer
    pub fn escalation(invocation_id: &str, author: &str, error_message: Option<String>) -> Self {
        let mut event = Self::new(invocation_id, author, None, true);
        event.actions.escalate = Some(true);
        event.error_message = error_message;
        event
    }

    /// Whether this event concludes its turn
    pub fn is_final_response(&self) -> bool {
        self.is_final
    }

    /// Force the final flag; used by hand-built event sequences
    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    pub fn is_escalation(&self) -> bool {
        self.actions.escalate == Some(true)
    }
}

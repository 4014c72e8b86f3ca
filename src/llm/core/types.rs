//! Core types for the LLM abstraction layer

use serde::{Deserialize, Serialize};

use super::config::GenerationConfig;

/// Request to generate content from an LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Conversation history
    pub messages: Vec<Message>,
    /// Available tools the model can call
    pub tools: Option<Vec<ToolDeclaration>>,
    /// Generation parameters
    pub config: GenerationConfig,
    /// System prompt/instructions
    pub system: Option<String>,
}

/// A single message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content blocks in the message
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a new user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Create a new assistant message with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Create a tool message carrying one or more tool results
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: results,
        }
    }

    /// Text of the first content block, if that block is text
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ContentBlock::Text { text }) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Human input
    User,
    /// Model output
    Assistant,
    /// Tool execution result
    Tool,
}

/// Content block within a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content
    Text { text: String },
    /// Tool invocation
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
        /// Opaque provider token that must accompany the call in later requests
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// Tool execution result
    ToolResult {
        tool_use_id: String,
        /// Name of the tool that produced this result
        name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    /// Successful result for the tool call `tool_use_id`
    pub fn tool_result(
        tool_use_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Failed result for the tool call `tool_use_id`
    pub fn tool_error(
        tool_use_id: impl Into<String>,
        name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            name: name.into(),
            content: error.into(),
            is_error: true,
        }
    }
}

/// Declaration of a tool available to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Function name
    pub name: String,
    /// What the tool does
    pub description: String,
    /// JSON Schema for parameters
    pub input_schema: serde_json::Value,
}

/// Events emitted during streaming generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Response begins
    MessageStart { message: MessageMetadata },
    /// New content block begins
    ContentBlockStart {
        index: usize,
        #[serde(rename = "content_block")]
        block: ContentBlockStart,
    },
    /// Incremental content update
    ContentDelta { index: usize, delta: ContentDelta },
    /// Content block complete
    ContentBlockEnd { index: usize },
    /// Response complete
    MessageEnd {
        finish_reason: FinishReason,
        usage: UsageMetadata,
    },
    /// Error occurred
    Error { error: String },
}

/// Metadata about a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Message ID
    pub id: String,
    /// Message role
    pub role: MessageRole,
}

/// Start of a content block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlockStart {
    /// Text block starting
    Text { text: String },
    /// Tool use block starting
    ToolUse {
        id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
}

/// Incremental content update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    /// Text token(s)
    TextDelta { text: String },
    /// Partial tool call arguments (accumulating JSON)
    ToolUseDelta { partial_json: String },
}

/// Reason why generation finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural completion
    Stop,
    /// Hit token limit
    MaxTokens,
    /// Blocked by safety filters
    Safety,
    /// Blocked for reproducing training data
    Recitation,
    /// Provider-specific reason
    Other(String),
}

impl FinishReason {
    /// Whether the model refused to answer rather than finishing normally
    pub fn is_blocked(&self) -> bool {
        matches!(self, FinishReason::Safety | FinishReason::Recitation)
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    /// Prompt tokens consumed
    pub input_tokens: u32,
    /// Response tokens generated
    pub output_tokens: u32,
    /// Sum of input and output
    pub total_tokens: u32,
}

impl UsageMetadata {
    /// Create new usage metadata
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }

    /// Add usage from another metadata
    pub fn add(&mut self, other: &UsageMetadata) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens = self.input_tokens + self.output_tokens;
    }
}

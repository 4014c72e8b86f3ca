//! LLM Abstraction Layer
//!
//! This module provides a streaming interface to Google Gemini models, served
//! either from Vertex AI or from the Gemini Developer API, plus the tool
//! calling agent loop built on top of it.

pub mod agent;
pub mod auth;
pub mod core;
pub mod gemini;
pub mod tools;

// Re-export commonly used types
pub use agent::{Agent, AgentError, AgentEvent};
pub use core::{
    config::GenerationConfig,
    error::LlmError,
    provider::{create_provider, LlmProvider, LlmStream},
    types::{
        ContentBlock, ContentDelta, FinishReason, GenerateRequest, Message, MessageRole,
        StreamEvent, ToolDeclaration, UsageMetadata,
    },
};
pub use gemini::{GeminiBackend, GeminiClient, GeminiModel};
pub use tools::{create_tool_declaration, FunctionRegistry, ToolExecutor};

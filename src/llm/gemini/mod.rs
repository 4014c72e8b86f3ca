//! Gemini provider implementation
//!
//! Streams `generateContent` responses from either Vertex AI or the Gemini
//! Developer API and maps them onto the provider-neutral [`StreamEvent`]s.
//!
//! [`StreamEvent`]: crate::llm::StreamEvent

pub mod client;
pub mod mapper;
pub mod sse;
pub mod types;

pub use client::{GeminiBackend, GeminiClient, GeminiModel};

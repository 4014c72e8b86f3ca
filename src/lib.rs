//! Weather assistant agent
//!
//! A Gemini-backed agent with one tool, `get_weather`, driven one
//! conversation turn at a time.

pub mod config;
pub mod conversation;
pub mod llm;
pub mod runtime;
pub mod weather;

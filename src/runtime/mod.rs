//! Session-scoped agent runtime
//!
//! [`AgentRuntime`] is the seam the conversation driver talks to: given a
//! user message for a session, it returns the turn's events as a stream.
//! [`Runner`] is the implementation backed by an [`Agent`](crate::llm::Agent)
//! and an [`InMemorySessionService`].

mod error;
mod event;
mod runner;
mod session;

pub use error::RuntimeError;
pub use event::{ConversationEvent, EventActions};
pub use runner::Runner;
pub use session::{InMemorySessionService, Session, SessionHandle};

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

use crate::llm::core::types::Message;

/// Events of one turn, in order
pub type EventStream<'a> =
    Pin<Box<dyn Stream<Item = Result<ConversationEvent, RuntimeError>> + Send + 'a>>;

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Start a turn for `(user_id, session_id)` with `new_message`
    async fn run_async<'a>(
        &'a self,
        user_id: &str,
        session_id: &str,
        new_message: Message,
    ) -> Result<EventStream<'a>, RuntimeError>;
}

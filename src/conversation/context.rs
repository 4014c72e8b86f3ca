use crate::runtime::{Runner, RuntimeError};

/// A runner bound to one user's session
///
/// Built explicitly with [`initialize`](Self::initialize); nothing is created
/// at import time and no executor is assumed beyond the one polling the
/// returned future.
pub struct ConversationContext {
    runner: Runner,
    user_id: String,
    session_id: String,
}

impl ConversationContext {
    /// Create the session in the runner's session service and bind to it
    ///
    /// # Errors
    ///
    /// `SessionAlreadyExists` if the session was already created.
    pub async fn initialize(
        runner: Runner,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Result<Self, RuntimeError> {
        let user_id = user_id.into();
        let session_id = session_id.into();

        runner
            .session_service()
            .create_session(runner.app_name(), &user_id, &session_id)
            .await?;
        tracing::info!(
            app_name = runner.app_name(),
            agent = runner.agent().name(),
            %user_id,
            %session_id,
            "Conversation context ready"
        );

        Ok(Self {
            runner,
            user_id,
            session_id,
        })
    }

    /// Initialize into `slot` on first use; later calls return the existing
    /// context and never build a runner
    pub async fn get_or_initialize<'a, F>(
        slot: &'a mut Option<Self>,
        make_runner: F,
        user_id: &str,
        session_id: &str,
    ) -> Result<&'a mut Self, RuntimeError>
    where
        F: FnOnce() -> Runner,
    {
        let context = match slot.take() {
            Some(context) => context,
            None => Self::initialize(make_runner(), user_id, session_id).await?,
        };
        Ok(slot.insert(context))
    }

    /// Run one turn on this context's session
    pub async fn run_turn(&self, query: &str) -> Result<String, RuntimeError> {
        super::run_turn(query, &self.runner, &self.user_id, &self.session_id).await
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

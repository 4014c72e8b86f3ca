//! Non-persistent session storage

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::error::RuntimeError;
use super::event::ConversationEvent;
use crate::llm::core::types::Message;

/// Conversation state for one (app, user, session) triple
#[derive(Debug, Clone)]
pub struct Session {
    pub app_name: String,
    pub user_id: String,
    pub id: String,
    /// History replayed to the model on every call
    pub messages: Vec<Message>,
    /// Every event the runner produced for this session
    pub events: Vec<ConversationEvent>,
    pub last_update_time: DateTime<Utc>,
}

impl Session {
    fn new(key: &SessionKey) -> Self {
        Self {
            app_name: key.app_name.clone(),
            user_id: key.user_id.clone(),
            id: key.session_id.clone(),
            messages: Vec::new(),
            events: Vec::new(),
            last_update_time: Utc::now(),
        }
    }
}

/// Shared, lockable session; held for the duration of a turn
pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    app_name: String,
    user_id: String,
    session_id: String,
}

impl SessionKey {
    fn new(app_name: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }

    fn not_found(self) -> RuntimeError {
        RuntimeError::SessionNotFound {
            app_name: self.app_name,
            user_id: self.user_id,
            session_id: self.session_id,
        }
    }

    fn already_exists(self) -> RuntimeError {
        RuntimeError::SessionAlreadyExists {
            app_name: self.app_name,
            user_id: self.user_id,
            session_id: self.session_id,
        }
    }
}

/// In-memory session store
///
/// Sessions vanish with the process.
#[derive(Debug, Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, SessionHandle>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session
    ///
    /// # Errors
    ///
    /// `SessionAlreadyExists` if the triple is taken.
    pub async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionHandle, RuntimeError> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(key.already_exists());
        }

        let session = Arc::new(Mutex::new(Session::new(&key)));
        sessions.insert(key, Arc::clone(&session));
        tracing::info!(app_name, user_id, session_id, "Session created");
        Ok(session)
    }

    pub async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionHandle, RuntimeError> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let sessions = self.sessions.read().await;
        match sessions.get(&key) {
            Some(session) => Ok(Arc::clone(session)),
            None => Err(key.not_found()),
        }
    }

    /// Ids of a user's sessions for an app, sorted
    pub async fn list_sessions(&self, app_name: &str, user_id: &str) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<String> = sessions
            .keys()
            .filter(|k| k.app_name == app_name && k.user_id == user_id)
            .map(|k| k.session_id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub async fn delete_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), RuntimeError> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let mut sessions = self.sessions.write().await;
        match sessions.remove(&key) {
            Some(_) => Ok(()),
            None => Err(key.not_found()),
        }
    }
}

//! Chat orchestrator: central coordinator wiring auth, directory and pipeline.
//!
//! Owns the shared [`ChatState`] and exposes the operations a front end
//! drives: mount, create, select, send and snapshot. Every method takes
//! `&self`, so several operations can be in flight on one runtime.

use std::sync::{Arc, Mutex};

use cartbot_core::types::{SessionId, User};

use crate::auth::AuthProvider;
use crate::backend::ChatBackend;
use crate::directory::SessionDirectory;
use crate::error::ChatError;
use crate::pipeline::{ConversationPipeline, SendOutcome};
use crate::state::{ChatState, SharedState};

pub struct ChatOrchestrator {
    auth: Arc<dyn AuthProvider>,
    state: SharedState,
    directory: SessionDirectory,
    pipeline: ConversationPipeline,
}

impl ChatOrchestrator {
    pub fn new(backend: Arc<dyn ChatBackend>, auth: Arc<dyn AuthProvider>) -> Self {
        let state: SharedState = Arc::new(Mutex::new(ChatState::new()));
        Self {
            auth,
            directory: SessionDirectory::new(Arc::clone(&backend), Arc::clone(&state)),
            pipeline: ConversationPipeline::new(backend, Arc::clone(&state)),
            state,
        }
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.auth.current_user()
    }

    fn require_auth(&self) -> Result<(), ChatError> {
        if self.auth.is_authenticated() {
            Ok(())
        } else {
            Err(ChatError::NotAuthenticated)
        }
    }

    /// Initial load: sessions (selecting the most recent), its messages,
    /// and the category list.
    ///
    /// Categories are fetched even when the session load fails, and that
    /// session error is what gets returned. A category failure is only logged.
    pub async fn mount(&self) -> Result<(), ChatError> {
        self.require_auth()?;
        if let Some(user) = self.auth.current_user() {
            tracing::info!(user_id = user.id, username = %user.username, "Mounting chat");
        }
        let sessions = self.directory.load().await;
        if let Err(e) = self.directory.load_categories().await {
            tracing::warn!(error = %e, "Continuing without categories");
        }
        sessions.map(|_| ())
    }

    pub async fn create_session(&self) -> Result<SessionId, ChatError> {
        self.require_auth()?;
        self.directory.create().await
    }

    pub async fn select_session(&self, id: SessionId) -> Result<(), ChatError> {
        self.require_auth()?;
        self.directory.select(id).await
    }

    /// Re-fetch the directory, keeping the current selection.
    pub async fn refresh_sessions(&self) -> Result<(), ChatError> {
        self.require_auth()?;
        self.directory.load().await.map(|_| ())
    }

    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, ChatError> {
        self.require_auth()?;
        self.pipeline.send(text).await
    }

    /// A copy of the current state for rendering.
    pub fn snapshot(&self) -> Result<ChatState, ChatError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| ChatError::State(format!("state lock poisoned: {}", e)))?;
        Ok(guard.clone())
    }
}

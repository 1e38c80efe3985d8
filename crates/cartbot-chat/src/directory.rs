//! Session directory: loading, creating and switching sessions.

use std::sync::Arc;

use cartbot_core::types::SessionId;

use crate::backend::ChatBackend;
use crate::error::ChatError;
use crate::state::{update, Completion, SharedState};

pub struct SessionDirectory {
    backend: Arc<dyn ChatBackend>,
    state: SharedState,
}

impl SessionDirectory {
    pub(crate) fn new(backend: Arc<dyn ChatBackend>, state: SharedState) -> Self {
        Self { backend, state }
    }

    /// Load the user's sessions in server order.
    ///
    /// If nothing was active, the first session becomes active and its
    /// messages are loaded. Returns the session selected this way.
    pub async fn load(&self) -> Result<Option<SessionId>, ChatError> {
        let sessions = self.backend.list_sessions().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to load sessions");
            e
        })?;
        tracing::info!(count = sessions.len(), "Sessions loaded");

        let selected = update(&self.state, |s| s.sessions_loaded(sessions))?;
        if let Some(id) = selected {
            tracing::debug!(session = %id, "Selected most recent session");
            self.load_messages(id).await?;
        }
        Ok(selected)
    }

    /// Create a session, put it first and make it active with an empty log.
    pub async fn create(&self) -> Result<SessionId, ChatError> {
        let session = self.backend.create_session().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to create session");
            e
        })?;
        let id = session.id;
        update(&self.state, |s| s.session_created(session))?;
        tracing::info!(session = %id, "Session created");
        Ok(id)
    }

    /// Make `id` active and replace the log with its messages.
    pub async fn select(&self, id: SessionId) -> Result<(), ChatError> {
        if !update(&self.state, |s| s.session_selected(id))? {
            return Err(ChatError::SessionNotFound(id));
        }
        tracing::debug!(session = %id, "Session selected");
        self.load_messages(id).await
    }

    /// Fetch the log of `id`. Dropped if another session became active
    /// while the request was in flight.
    pub async fn load_messages(&self, id: SessionId) -> Result<(), ChatError> {
        let messages = self.backend.list_messages(id).await.map_err(|e| {
            tracing::error!(session = %id, error = %e, "Failed to load messages");
            e
        })?;
        let count = messages.len();
        match update(&self.state, |s| s.messages_loaded(id, messages))? {
            Completion::Applied => tracing::debug!(session = %id, count, "Messages loaded"),
            Completion::Stale => {
                tracing::debug!(session = %id, "Discarding messages for inactive session")
            }
        }
        Ok(())
    }

    /// Fetch the product category list. Failure leaves the list as it was.
    pub async fn load_categories(&self) -> Result<(), ChatError> {
        let categories = self.backend.list_categories().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to load categories");
            e
        })?;
        update(&self.state, |s| s.categories_loaded(categories))?;
        Ok(())
    }
}

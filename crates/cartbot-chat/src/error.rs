//! Error types for the chat client.

use cartbot_core::error::CartbotError;
use cartbot_core::types::SessionId;

/// Failures talking to the chat backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("not signed in")]
    NotAuthenticated,
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("state error: {0}")]
    State(String),
    #[error("token store error: {0}")]
    TokenStore(#[from] CartbotError),
}

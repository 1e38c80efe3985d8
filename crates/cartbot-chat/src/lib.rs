//! Conversational shopping client for Cartbot.
//!
//! Provides the chat session directory, the send/search conversation
//! pipeline, heuristic intent extraction, and the backend and auth
//! collaborators they talk to.

pub mod auth;
pub mod backend;
pub mod directory;
pub mod error;
pub mod intent;
pub mod orchestrator;
pub mod pipeline;
pub mod response;
pub mod search;
pub mod state;

pub use auth::{AccountClient, AuthProvider, Credentials, TokenAuth, TokenStore};
pub use backend::{ChatBackend, HttpBackend, MockBackend};
pub use directory::SessionDirectory;
pub use error::{BackendError, ChatError};
pub use orchestrator::ChatOrchestrator;
pub use pipeline::{ConversationPipeline, SearchReport, SendOutcome};
pub use search::{ProductSearch, SearchOutcome};
pub use state::{ChatState, Completion, Delivery, LogEntry, Phase, SendTicket};

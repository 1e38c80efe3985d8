//! Chat backend abstraction.
//!
//! Defines the `ChatBackend` async trait the pipeline talks to, with an
//! HTTP implementation for the real service and an in-memory one for tests.

pub mod http;
pub mod mock;

use async_trait::async_trait;

use cartbot_core::types::{Message, Product, SearchCriteria, SendReceipt, Session, SessionId};

use crate::error::BackendError;

pub use http::HttpBackend;
pub use mock::MockBackend;

/// Remote chat and catalog service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sessions of the current user, most recent first.
    async fn list_sessions(&self) -> Result<Vec<Session>, BackendError>;

    /// Create a new empty session.
    async fn create_session(&self) -> Result<Session, BackendError>;

    /// Messages of `session` in append order.
    async fn list_messages(&self, session: SessionId) -> Result<Vec<Message>, BackendError>;

    /// Post a user message and receive the stored user message and bot reply.
    async fn send_message(
        &self,
        session: SessionId,
        content: &str,
    ) -> Result<SendReceipt, BackendError>;

    /// Products matching the present fields of `criteria`.
    async fn search_products(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Product>, BackendError>;

    /// Distinct catalog category names.
    async fn list_categories(&self) -> Result<Vec<String>, BackendError>;
}

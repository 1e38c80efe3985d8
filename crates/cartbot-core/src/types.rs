use std::fmt;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Server-assigned chat session identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message identifier.
///
/// Messages stored by the backend carry its integer id. Messages produced by
/// the client (pending sends, search summaries) carry a random UUID so they
/// can never collide with a backend id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Remote(i64),
    Local(Uuid),
}

impl MessageId {
    /// Generate a fresh client-side identifier.
    pub fn local() -> Self {
        MessageId::Local(Uuid::new_v4())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, MessageId::Local(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Remote(id) => write!(f, "{}", id),
            MessageId::Local(id) => write!(f, "local-{}", id),
        }
    }
}

// =============================================================================
// Domain records
// =============================================================================

/// The authenticated user as reported by the backend at login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// A chat conversation owned by the current user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub created_at: NaiveDateTime,
    /// Absent in the create-session response; see [`Session::last_activity`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

impl Session {
    /// Time of the most recent activity, falling back to creation time.
    pub fn last_activity(&self) -> NaiveDateTime {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// A single chat message. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub is_bot: bool,
    pub timestamp: NaiveDateTime,
}

impl Message {
    /// Build a message that exists only on the client, stamped with the
    /// current UTC time.
    pub fn local(content: impl Into<String>, is_bot: bool) -> Self {
        Self {
            id: MessageId::local(),
            content: content.into(),
            is_bot,
            timestamp: Utc::now().naive_utc(),
        }
    }
}

/// Backend acknowledgment of a sent message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub user_message: Message,
    pub bot_message: Message,
}

/// A catalog product returned by search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
}

// =============================================================================
// Search criteria
// =============================================================================

/// Structured product search derived from free text.
///
/// Absent fields are never sent; the backend reads an omitted parameter as
/// "unconstrained".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<i64>,
}

impl SearchCriteria {
    /// True when no field was extracted.
    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.category.is_none() && self.max_price.is_none()
    }

    /// Query-string pairs for the present fields only, in a fixed order.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if let Some(ref q) = self.query {
            params.push(("query", q.clone()));
        }
        if let Some(ref c) = self.category {
            params.push(("category", c.clone()));
        }
        if let Some(p) = self.max_price {
            params.push(("max_price", p.to_string()));
        }
        params
    }
}

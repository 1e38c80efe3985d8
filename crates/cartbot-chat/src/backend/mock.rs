//! In-memory chat backend for tests and local experiments.
//!
//! Behaves like the real service for the parts the client relies on:
//! sessions listed most recently active first, messages in append order,
//! product search filtering by query text, exact category and price
//! ceiling. Bot replies are scripted. Individual endpoints can be made to
//! fail or to block until released.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use cartbot_core::types::{
    Message, MessageId, Product, SearchCriteria, SendReceipt, Session, SessionId,
};

use super::ChatBackend;
use crate::error::BackendError;

/// Reply used when no scripted reply is queued.
pub const DEFAULT_REPLY: &str =
    "I'm here to help you shop. You can ask me about products, prices, or categories. What would you like to know?";

/// Backend operations, used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ListSessions,
    CreateSession,
    ListMessages,
    SendMessage,
    SearchProducts,
    ListCategories,
}

#[derive(Default)]
struct Store {
    sessions: Vec<Session>,
    messages: HashMap<SessionId, Vec<Message>>,
    next_session_id: i64,
    next_message_id: i64,
}

/// Scriptable in-memory [`ChatBackend`].
#[derive(Default)]
pub struct MockBackend {
    store: Mutex<Store>,
    catalog: Mutex<Vec<Product>>,
    replies: Mutex<VecDeque<String>>,
    default_reply: Mutex<Option<String>>,
    failing: Mutex<HashSet<Endpoint>>,
    gates: Mutex<HashMap<Endpoint, Arc<Notify>>>,
    send_gates: Mutex<HashMap<SessionId, Arc<Notify>>>,
    calls: Mutex<HashMap<Endpoint, usize>>,
    searches: Mutex<Vec<SearchCriteria>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the product catalog.
    pub fn with_catalog(self, products: Vec<Product>) -> Self {
        *lock(&self.catalog) = products;
        self
    }

    /// Reply with `reply` whenever the queue is empty.
    pub fn with_default_reply(self, reply: impl Into<String>) -> Self {
        *lock(&self.default_reply) = Some(reply.into());
        self
    }

    /// Queue a bot reply for the next send.
    pub fn push_reply(&self, reply: impl Into<String>) {
        lock(&self.replies).push_back(reply.into());
    }

    /// Make `endpoint` fail (or succeed again) on subsequent calls.
    pub fn set_failing(&self, endpoint: Endpoint, failing: bool) {
        let mut set = lock(&self.failing);
        if failing {
            set.insert(endpoint);
        } else {
            set.remove(&endpoint);
        }
    }

    /// Block calls to `endpoint` until the returned handle is notified.
    /// Each `notify_one` releases a single call.
    pub fn hold(&self, endpoint: Endpoint) -> Arc<Notify> {
        Arc::clone(lock(&self.gates).entry(endpoint).or_default())
    }

    /// Like [`hold`](Self::hold), but only for sends to `session`.
    pub fn hold_send(&self, session: SessionId) -> Arc<Notify> {
        Arc::clone(lock(&self.send_gates).entry(session).or_default())
    }

    /// Number of calls made to `endpoint` so far.
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        lock(&self.calls).get(&endpoint).copied().unwrap_or(0)
    }

    /// Criteria of every product search received, in order.
    pub fn searches(&self) -> Vec<SearchCriteria> {
        lock(&self.searches).clone()
    }

    /// Create a session holding `contents` as alternating user/bot messages.
    pub fn seed_session(&self, contents: &[&str]) -> SessionId {
        let mut store = lock(&self.store);
        let session = new_session(&mut store);
        let id = session.id;
        for (i, content) in contents.iter().enumerate() {
            let msg = new_message(&mut store, content, i % 2 == 1);
            store.messages.entry(id).or_default().push(msg);
        }
        store.sessions.insert(0, session);
        id
    }

    async fn enter(&self, endpoint: Endpoint) -> Result<(), BackendError> {
        *lock(&self.calls).entry(endpoint).or_insert(0) += 1;
        let gate = lock(&self.gates).get(&endpoint).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if lock(&self.failing).contains(&endpoint) {
            return Err(BackendError::Transport(format!(
                "{:?} unavailable",
                endpoint
            )));
        }
        Ok(())
    }

    fn next_reply(&self) -> String {
        if let Some(reply) = lock(&self.replies).pop_front() {
            return reply;
        }
        lock(&self.default_reply)
            .clone()
            .unwrap_or_else(|| DEFAULT_REPLY.to_string())
    }
}

fn new_session(store: &mut Store) -> Session {
    store.next_session_id += 1;
    let now = Utc::now().naive_utc();
    Session {
        id: SessionId(store.next_session_id),
        created_at: now,
        updated_at: Some(now),
    }
}

fn new_message(store: &mut Store, content: &str, is_bot: bool) -> Message {
    store.next_message_id += 1;
    Message {
        id: MessageId::Remote(store.next_message_id),
        content: content.to_string(),
        is_bot,
        timestamp: Utc::now().naive_utc(),
    }
}

fn not_found() -> BackendError {
    BackendError::Status {
        status: 404,
        message: "Session not found".to_string(),
    }
}

fn matches_criteria(product: &Product, criteria: &SearchCriteria) -> bool {
    if let Some(ref q) = criteria.query {
        let q = q.to_lowercase();
        if !product.name.to_lowercase().contains(&q)
            && !product.description.to_lowercase().contains(&q)
        {
            return false;
        }
    }
    if let Some(ref c) = criteria.category {
        if &product.category != c {
            return false;
        }
    }
    if let Some(max) = criteria.max_price {
        if product.price > max as f64 {
            return false;
        }
    }
    true
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn list_sessions(&self) -> Result<Vec<Session>, BackendError> {
        self.enter(Endpoint::ListSessions).await?;
        let mut sessions = lock(&self.store).sessions.clone();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.last_activity()));
        Ok(sessions)
    }

    async fn create_session(&self) -> Result<Session, BackendError> {
        self.enter(Endpoint::CreateSession).await?;
        let mut store = lock(&self.store);
        let session = new_session(&mut store);
        store.sessions.insert(0, session.clone());
        // The create endpoint reports only id and creation time.
        Ok(Session {
            updated_at: None,
            ..session
        })
    }

    async fn list_messages(&self, session: SessionId) -> Result<Vec<Message>, BackendError> {
        self.enter(Endpoint::ListMessages).await?;
        let store = lock(&self.store);
        if !store.sessions.iter().any(|s| s.id == session) {
            return Err(not_found());
        }
        Ok(store.messages.get(&session).cloned().unwrap_or_default())
    }

    async fn send_message(
        &self,
        session: SessionId,
        content: &str,
    ) -> Result<SendReceipt, BackendError> {
        self.enter(Endpoint::SendMessage).await?;
        let gate = lock(&self.send_gates).get(&session).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if content.is_empty() {
            return Err(BackendError::Status {
                status: 400,
                message: "Message content required".to_string(),
            });
        }
        let reply = self.next_reply();
        let mut store = lock(&self.store);
        let now = Utc::now().naive_utc();
        match store.sessions.iter_mut().find(|s| s.id == session) {
            Some(s) => s.updated_at = Some(now),
            None => return Err(not_found()),
        }
        let user_message = new_message(&mut store, content, false);
        let bot_message = new_message(&mut store, &reply, true);
        let log = store.messages.entry(session).or_default();
        log.push(user_message.clone());
        log.push(bot_message.clone());
        Ok(SendReceipt {
            user_message,
            bot_message,
        })
    }

    async fn search_products(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Product>, BackendError> {
        self.enter(Endpoint::SearchProducts).await?;
        lock(&self.searches).push(criteria.clone());
        Ok(lock(&self.catalog)
            .iter()
            .filter(|p| matches_criteria(p, criteria))
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<String>, BackendError> {
        self.enter(Endpoint::ListCategories).await?;
        let mut seen = HashSet::new();
        Ok(lock(&self.catalog)
            .iter()
            .filter(|p| seen.insert(p.category.clone()))
            .map(|p| p.category.clone())
            .collect())
    }
}

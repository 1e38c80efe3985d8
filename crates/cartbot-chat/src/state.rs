//! Client chat state and its transitions.
//!
//! `ChatState` owns everything the view renders: the session directory,
//! the active session's message log, the product panel and the per-session
//! send phase. It is only changed through the reducer methods below, each
//! of which is a whole update that bumps `version`.
//!
//! Results of network calls are tagged with the session they were issued
//! for and are applied only if that session is still active.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use cartbot_core::types::{Message, MessageId, Product, SendReceipt, Session, SessionId};

use crate::error::ChatError;
use crate::response::search_summary_message;
use crate::search::SearchOutcome;

// =============================================================================
// Phase
// =============================================================================

/// Send lifecycle of one session.
///
/// - Idle -> Sending (message submitted)
/// - Sending -> Searching (bot reply triggered a product search)
/// - Sending -> Idle (no search, send failed, or reply discarded)
/// - Searching -> Idle (search finished or abandoned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Sending,
    Searching,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Sending => write!(f, "Sending"),
            Phase::Searching => write!(f, "Searching"),
        }
    }
}

impl Phase {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &Phase) -> bool {
        matches!(
            (self, target),
            (Phase::Idle, Phase::Sending)
                | (Phase::Sending, Phase::Searching)
                | (Phase::Sending, Phase::Idle)
                | (Phase::Searching, Phase::Idle)
        )
    }
}

// =============================================================================
// Log entries
// =============================================================================

/// Delivery status of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Shown locally, not yet acknowledged by the backend.
    Pending,
    /// Final: stored by the backend, or synthesized locally.
    Confirmed,
    /// The backend rejected or never received the send.
    Failed,
}

/// A message as displayed in the log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub message: Message,
    pub delivery: Delivery,
}

impl LogEntry {
    fn confirmed(message: Message) -> Self {
        Self {
            message,
            delivery: Delivery::Confirmed,
        }
    }
}

/// Handle for an in-flight send, returned by [`ChatState::send_started`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    /// Session the send was issued for.
    pub session: SessionId,
    /// Id of the pending log entry.
    pub pending_id: MessageId,
    /// The text exactly as submitted.
    pub text: String,
}

/// Whether a tagged completion reached the displayed log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The session is no longer active; the result was dropped.
    Stale,
}

// =============================================================================
// ChatState
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    sessions: Vec<Session>,
    active: Option<SessionId>,
    messages: Vec<LogEntry>,
    products: Vec<Product>,
    categories: Vec<String>,
    phases: HashMap<SessionId, Phase>,
    version: u64,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Accessors --

    /// Session directory, most recent first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active
    }

    /// Message log of the active session, in order.
    pub fn messages(&self) -> &[LogEntry] {
        &self.messages
    }

    /// Products from the most recent completed search.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// The product panel is hidden whenever there is nothing to show.
    pub fn show_products(&self) -> bool {
        !self.products.is_empty()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn phase(&self, session: SessionId) -> Phase {
        self.phases.get(&session).copied().unwrap_or(Phase::Idle)
    }

    /// Phase of the active session; `Idle` when there is none.
    pub fn active_phase(&self) -> Phase {
        self.active.map(|s| self.phase(s)).unwrap_or(Phase::Idle)
    }

    /// Whether the input is enabled.
    pub fn can_send(&self) -> bool {
        self.active.is_some() && self.active_phase() == Phase::Idle
    }

    /// Incremented by every reducer.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn is_active(&self, session: SessionId) -> bool {
        self.active == Some(session)
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn set_phase(&mut self, session: SessionId, target: Phase) {
        let current = self.phase(session);
        if current == target {
            return;
        }
        if !current.can_transition_to(&target) {
            tracing::warn!(session = %session, "Ignoring phase transition {} -> {}", current, target);
            return;
        }
        tracing::debug!(session = %session, "Phase {} -> {}", current, target);
        if target == Phase::Idle {
            self.phases.remove(&session);
        } else {
            self.phases.insert(session, target);
        }
    }

    // -- Session directory reducers --

    /// Replace the directory with the server's list.
    ///
    /// Selects the first session when none is active and returns it so the
    /// caller can load its messages.
    pub fn sessions_loaded(&mut self, sessions: Vec<Session>) -> Option<SessionId> {
        self.sessions = sessions;
        self.touch();
        if self.active.is_none() {
            if let Some(first) = self.sessions.first().map(|s| s.id) {
                self.active = Some(first);
                self.messages.clear();
                return Some(first);
            }
        }
        None
    }

    /// Prepend a freshly created session and make it active with an empty log.
    pub fn session_created(&mut self, session: Session) {
        let id = session.id;
        self.sessions.retain(|s| s.id != id);
        self.sessions.insert(0, session);
        self.active = Some(id);
        self.messages.clear();
        self.touch();
    }

    /// Make `session` active and clear the log until its messages arrive.
    ///
    /// Returns `false` (and changes nothing) if the id is not in the directory.
    pub fn session_selected(&mut self, session: SessionId) -> bool {
        if !self.sessions.iter().any(|s| s.id == session) {
            return false;
        }
        self.active = Some(session);
        self.messages.clear();
        self.touch();
        true
    }

    /// Replace the log with the loaded messages of `session`.
    pub fn messages_loaded(&mut self, session: SessionId, messages: Vec<Message>) -> Completion {
        if !self.is_active(session) {
            return Completion::Stale;
        }
        self.messages = messages.into_iter().map(LogEntry::confirmed).collect();
        self.touch();
        Completion::Applied
    }

    pub fn categories_loaded(&mut self, categories: Vec<String>) {
        self.categories = categories;
        self.touch();
    }

    // -- Conversation reducers --

    /// Begin a send on the active session.
    ///
    /// Returns `None` without changing anything if `text` is blank, no
    /// session is active, or the active session is already busy.
    pub fn send_started(&mut self, text: &str) -> Option<SendTicket> {
        if text.trim().is_empty() {
            return None;
        }
        let session = self.active?;
        if self.phase(session) != Phase::Idle {
            return None;
        }
        let pending = Message::local(text, false);
        let ticket = SendTicket {
            session,
            pending_id: pending.id,
            text: text.to_string(),
        };
        self.messages.push(LogEntry {
            message: pending,
            delivery: Delivery::Pending,
        });
        self.set_phase(session, Phase::Sending);
        self.touch();
        Some(ticket)
    }

    /// Swap the pending entry for the confirmed user message followed by
    /// the bot reply, in one update. The phase stays `Sending`.
    pub fn send_completed(&mut self, ticket: &SendTicket, receipt: &SendReceipt) -> Completion {
        if !self.is_active(ticket.session) {
            return Completion::Stale;
        }
        self.messages.retain(|e| e.message.id != ticket.pending_id);
        // A reload that raced the send may already contain these messages.
        for msg in [&receipt.user_message, &receipt.bot_message] {
            if !self.messages.iter().any(|e| e.message.id == msg.id) {
                self.messages.push(LogEntry::confirmed(msg.clone()));
            }
        }
        self.touch();
        Completion::Applied
    }

    /// Mark the pending entry failed and release the session.
    pub fn send_failed(&mut self, ticket: &SendTicket) -> Completion {
        self.set_phase(ticket.session, Phase::Idle);
        self.touch();
        if !self.is_active(ticket.session) {
            return Completion::Stale;
        }
        if let Some(entry) = self
            .messages
            .iter_mut()
            .find(|e| e.message.id == ticket.pending_id)
        {
            entry.delivery = Delivery::Failed;
        }
        Completion::Applied
    }

    pub fn search_started(&mut self, session: SessionId) {
        self.set_phase(session, Phase::Searching);
        self.touch();
    }

    /// Show the search results and append the summary message.
    ///
    /// Returns the summary message when applied.
    pub fn search_completed(
        &mut self,
        session: SessionId,
        outcome: SearchOutcome,
    ) -> (Completion, Option<Message>) {
        self.set_phase(session, Phase::Idle);
        self.touch();
        if !self.is_active(session) {
            return (Completion::Stale, None);
        }
        let summary = search_summary_message(&outcome);
        self.messages.push(LogEntry::confirmed(summary.clone()));
        self.products = outcome.into_products();
        (Completion::Applied, Some(summary))
    }

    /// Release the session after a failed search. Products and log are
    /// left as they were.
    pub fn search_abandoned(&mut self, session: SessionId) {
        self.set_phase(session, Phase::Idle);
        self.touch();
    }

    /// Release the session when the chain ends without a search.
    pub fn send_finished(&mut self, session: SessionId) {
        self.set_phase(session, Phase::Idle);
        self.touch();
    }
}

// =============================================================================
// Shared handle
// =============================================================================

/// The single state value shared by every logical task.
pub(crate) type SharedState = Arc<Mutex<ChatState>>;

/// Run one reducer under the lock.
pub(crate) fn update<R>(
    state: &SharedState,
    f: impl FnOnce(&mut ChatState) -> R,
) -> Result<R, ChatError> {
    let mut guard = state
        .lock()
        .map_err(|e| ChatError::State(format!("state lock poisoned: {}", e)))?;
    Ok(f(&mut guard))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn session(id: i64) -> Session {
        Session {
            id: SessionId(id),
            created_at: ts(),
            updated_at: Some(ts()),
        }
    }

    fn remote(id: i64, content: &str, is_bot: bool) -> Message {
        Message {
            id: MessageId::Remote(id),
            content: content.to_string(),
            is_bot,
            timestamp: ts(),
        }
    }

    fn receipt(user_id: i64, text: &str, reply: &str) -> SendReceipt {
        SendReceipt {
            user_message: remote(user_id, text, false),
            bot_message: remote(user_id + 1, reply, true),
        }
    }

    fn product(id: i64) -> Product {
        Product {
            id,
            name: format!("Shirt {}", id),
            price: 20.0,
            category: "clothing".to_string(),
            description: String::new(),
            stock: 3,
            image_url: None,
        }
    }

    fn state_with_active(id: i64) -> ChatState {
        let mut state = ChatState::new();
        state.sessions_loaded(vec![session(id)]);
        state
    }

    // ---- Phase ----

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Idle.to_string(), "Idle");
        assert_eq!(Phase::Sending.to_string(), "Sending");
        assert_eq!(Phase::Searching.to_string(), "Searching");
    }

    #[test]
    fn test_phase_transitions() {
        assert!(Phase::Idle.can_transition_to(&Phase::Sending));
        assert!(Phase::Sending.can_transition_to(&Phase::Searching));
        assert!(Phase::Sending.can_transition_to(&Phase::Idle));
        assert!(Phase::Searching.can_transition_to(&Phase::Idle));

        assert!(!Phase::Idle.can_transition_to(&Phase::Searching));
        assert!(!Phase::Searching.can_transition_to(&Phase::Sending));
        assert!(!Phase::Idle.can_transition_to(&Phase::Idle));
    }

    // ---- Directory ----

    #[test]
    fn test_sessions_loaded_selects_first() {
        let mut state = ChatState::new();
        let selected = state.sessions_loaded(vec![session(9), session(3)]);
        assert_eq!(selected, Some(SessionId(9)));
        assert_eq!(state.active_session(), Some(SessionId(9)));
    }

    #[test]
    fn test_sessions_loaded_keeps_existing_active() {
        let mut state = state_with_active(1);
        let selected = state.sessions_loaded(vec![session(2), session(1)]);
        assert_eq!(selected, None);
        assert_eq!(state.active_session(), Some(SessionId(1)));
    }

    #[test]
    fn test_sessions_loaded_empty_leaves_none_active() {
        let mut state = ChatState::new();
        assert_eq!(state.sessions_loaded(vec![]), None);
        assert_eq!(state.active_session(), None);
        assert!(!state.can_send());
    }

    #[test]
    fn test_session_created_prepends_and_clears_log() {
        let mut state = state_with_active(1);
        state.messages_loaded(SessionId(1), vec![remote(1, "old", false)]);
        state.session_created(session(2));

        assert_eq!(state.sessions()[0].id, SessionId(2));
        assert_eq!(state.sessions().len(), 2);
        assert_eq!(state.active_session(), Some(SessionId(2)));
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_session_selected_unknown_is_rejected() {
        let mut state = state_with_active(1);
        let before = state.version();
        assert!(!state.session_selected(SessionId(77)));
        assert_eq!(state.active_session(), Some(SessionId(1)));
        assert_eq!(state.version(), before);
    }

    #[test]
    fn test_messages_loaded_replaces_log() {
        let mut state = ChatState::new();
        state.sessions_loaded(vec![session(1), session(2)]);
        state.messages_loaded(SessionId(1), vec![remote(1, "a", false), remote(2, "b", true)]);

        assert!(state.session_selected(SessionId(2)));
        assert!(state.messages().is_empty());
        state.messages_loaded(SessionId(2), vec![remote(3, "c", false)]);
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].message.content, "c");
    }

    #[test]
    fn test_messages_loaded_for_inactive_session_is_stale() {
        let mut state = ChatState::new();
        state.sessions_loaded(vec![session(1), session(2)]);
        let result = state.messages_loaded(SessionId(2), vec![remote(1, "x", false)]);
        assert_eq!(result, Completion::Stale);
        assert!(state.messages().is_empty());
    }

    // ---- Sending ----

    #[test]
    fn test_send_started_blank_is_noop() {
        let mut state = state_with_active(1);
        let before = state.version();
        assert!(state.send_started("").is_none());
        assert!(state.send_started("   \t\n").is_none());
        assert!(state.messages().is_empty());
        assert_eq!(state.version(), before);
    }

    #[test]
    fn test_send_started_without_session_is_noop() {
        let mut state = ChatState::new();
        assert!(state.send_started("hello").is_none());
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_send_started_appends_pending_and_blocks_second_send() {
        let mut state = state_with_active(1);
        let ticket = state.send_started("hello").unwrap();
        assert_eq!(ticket.session, SessionId(1));
        assert_eq!(ticket.text, "hello");
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].delivery, Delivery::Pending);
        assert_eq!(state.active_phase(), Phase::Sending);
        assert!(!state.can_send());

        assert!(state.send_started("again").is_none());
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_send_completed_replaces_pending_with_pair() {
        let mut state = state_with_active(1);
        state.messages_loaded(SessionId(1), vec![remote(1, "earlier", false)]);
        let ticket = state.send_started("hi").unwrap();

        let result = state.send_completed(&ticket, &receipt(10, "hi", "Hello!"));
        assert_eq!(result, Completion::Applied);

        let contents: Vec<&str> = state
            .messages()
            .iter()
            .map(|e| e.message.content.as_str())
            .collect();
        assert_eq!(contents, vec!["earlier", "hi", "Hello!"]);
        assert!(state
            .messages()
            .iter()
            .all(|e| e.delivery == Delivery::Confirmed));
        // Still busy until the chain finishes.
        assert_eq!(state.active_phase(), Phase::Sending);

        state.send_finished(SessionId(1));
        assert!(state.can_send());
    }

    #[test]
    fn test_send_completed_skips_messages_already_loaded() {
        let mut state = state_with_active(1);
        let ticket = state.send_started("hi").unwrap();
        let r = receipt(10, "hi", "Hello!");
        // A reload landed first and already holds both messages.
        state.messages_loaded(
            SessionId(1),
            vec![r.user_message.clone(), r.bot_message.clone()],
        );
        state.send_completed(&ticket, &r);
        assert_eq!(state.messages().len(), 2);
    }

    #[test]
    fn test_send_completed_after_switch_is_stale() {
        let mut state = ChatState::new();
        state.sessions_loaded(vec![session(1), session(2)]);
        let ticket = state.send_started("hi").unwrap();
        state.session_selected(SessionId(2));

        let result = state.send_completed(&ticket, &receipt(10, "hi", "Hello!"));
        assert_eq!(result, Completion::Stale);
        assert!(state.messages().is_empty());

        // Session 1 is still busy until the chain releases it.
        assert_eq!(state.phase(SessionId(1)), Phase::Sending);
        assert!(state.can_send());
        state.send_finished(SessionId(1));
        assert_eq!(state.phase(SessionId(1)), Phase::Idle);
    }

    #[test]
    fn test_send_failed_marks_entry_and_releases() {
        let mut state = state_with_active(1);
        let ticket = state.send_started("hi").unwrap();
        assert_eq!(state.send_failed(&ticket), Completion::Applied);
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].delivery, Delivery::Failed);
        assert!(state.can_send());
    }

    // ---- Searching ----

    #[test]
    fn test_search_completed_found() {
        let mut state = state_with_active(1);
        let ticket = state.send_started("shirts").unwrap();
        state.send_completed(&ticket, &receipt(1, "shirts", "Here are some products"));
        state.search_started(SessionId(1));
        assert_eq!(state.active_phase(), Phase::Searching);

        let (result, summary) =
            state.search_completed(SessionId(1), SearchOutcome::Found(vec![product(1), product(2)]));
        assert_eq!(result, Completion::Applied);
        assert!(summary.unwrap().content.contains('2'));
        assert_eq!(state.products().len(), 2);
        assert!(state.show_products());
        assert_eq!(state.messages().len(), 3);
        assert!(state.can_send());
    }

    #[test]
    fn test_search_completed_not_found_hides_panel() {
        let mut state = state_with_active(1);
        state.products = vec![product(1)];
        let ticket = state.send_started("shirts").unwrap();
        state.send_completed(&ticket, &receipt(1, "shirts", "Here are some products"));
        state.search_started(SessionId(1));
        state.search_completed(SessionId(1), SearchOutcome::NotFound);
        assert!(!state.show_products());
        assert!(state.messages().last().unwrap().message.is_bot);
    }

    #[test]
    fn test_search_abandoned_keeps_products() {
        let mut state = state_with_active(1);
        state.products = vec![product(1)];
        let ticket = state.send_started("shirts").unwrap();
        state.send_completed(&ticket, &receipt(1, "shirts", "Here are some products"));
        state.search_started(SessionId(1));
        state.search_abandoned(SessionId(1));
        assert_eq!(state.products().len(), 1);
        assert_eq!(state.messages().len(), 2);
        assert!(state.can_send());
    }

    #[test]
    fn test_search_completed_after_switch_is_stale() {
        let mut state = ChatState::new();
        state.sessions_loaded(vec![session(1), session(2)]);
        let ticket = state.send_started("shirts").unwrap();
        state.send_completed(&ticket, &receipt(1, "shirts", "Here are some products"));
        state.search_started(SessionId(1));
        state.session_selected(SessionId(2));

        let (result, summary) =
            state.search_completed(SessionId(1), SearchOutcome::Found(vec![product(1)]));
        assert_eq!(result, Completion::Stale);
        assert!(summary.is_none());
        assert!(state.products().is_empty());
        assert!(state.messages().is_empty());
        assert_eq!(state.phase(SessionId(1)), Phase::Idle);
    }

    #[test]
    fn test_every_reducer_bumps_version() {
        let mut state = ChatState::new();
        let mut last = state.version();
        let mut check = |state: &ChatState| {
            assert!(state.version() > last);
            last = state.version();
        };
        state.sessions_loaded(vec![session(1)]);
        check(&state);
        state.categories_loaded(vec!["books".to_string()]);
        check(&state);
        let ticket = state.send_started("hi").unwrap();
        check(&state);
        state.send_completed(&ticket, &receipt(1, "hi", "yo"));
        check(&state);
        state.send_finished(SessionId(1));
        check(&state);
        state.session_created(session(2));
        check(&state);
        state.session_selected(SessionId(1));
        check(&state);
        state.messages_loaded(SessionId(1), vec![]);
        check(&state);
    }
}

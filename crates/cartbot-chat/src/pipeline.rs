//! Conversation pipeline: send, trigger check, optional product search.
//!
//! One call to [`ConversationPipeline::send`] runs the whole causal chain
//! for a single user message. Each step awaits the previous one and every
//! state change goes through a [`ChatState`](crate::state::ChatState)
//! reducer, tagged with the session the send was issued for.

use std::sync::Arc;

use cartbot_core::types::{SendReceipt, SessionId};

use crate::backend::ChatBackend;
use crate::error::ChatError;
use crate::intent;
use crate::response::is_search_trigger;
use crate::search::ProductSearch;
use crate::state::{update, Completion, SharedState};

/// What happened to a send.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Blank text, no active session, or a send already in flight.
    Skipped,
    /// The backend stored the exchange and it was applied to the log.
    Delivered {
        receipt: SendReceipt,
        search: SearchReport,
    },
    /// The backend stored the exchange but its session is no longer shown.
    Discarded,
}

/// What happened after the bot reply arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchReport {
    /// The reply did not contain the trigger phrase.
    NotTriggered,
    /// Triggered, but nothing could be extracted from the user text.
    NoCriteria,
    Found(usize),
    NotFound,
    /// The search call failed; logged and dropped.
    Abandoned,
    /// The search finished after its session stopped being active.
    Discarded,
}

pub struct ConversationPipeline {
    backend: Arc<dyn ChatBackend>,
    search: ProductSearch,
    state: SharedState,
}

impl ConversationPipeline {
    pub(crate) fn new(backend: Arc<dyn ChatBackend>, state: SharedState) -> Self {
        Self {
            search: ProductSearch::new(Arc::clone(&backend)),
            backend,
            state,
        }
    }

    /// Send `text` on the active session and run the follow-up chain.
    ///
    /// A backend failure on the send itself marks the pending entry failed,
    /// releases the session and is returned. Search failures are not errors.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ChatError> {
        let Some(ticket) = update(&self.state, |s| s.send_started(text))? else {
            tracing::debug!("Send skipped");
            return Ok(SendOutcome::Skipped);
        };
        let session = ticket.session;
        tracing::debug!(session = %session, "Sending message");

        let receipt = match self.backend.send_message(session, &ticket.text).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(session = %session, error = %e, "Send failed");
                update(&self.state, |s| s.send_failed(&ticket))?;
                return Err(e.into());
            }
        };

        if update(&self.state, |s| s.send_completed(&ticket, &receipt))? == Completion::Stale {
            tracing::debug!(session = %session, "Discarding reply for inactive session");
            update(&self.state, |s| s.send_finished(session))?;
            return Ok(SendOutcome::Discarded);
        }

        let search = self
            .follow_up(session, &ticket.text, &receipt.bot_message.content)
            .await?;
        Ok(SendOutcome::Delivered { receipt, search })
    }

    async fn follow_up(
        &self,
        session: SessionId,
        user_text: &str,
        bot_content: &str,
    ) -> Result<SearchReport, ChatError> {
        if !is_search_trigger(bot_content) {
            update(&self.state, |s| s.send_finished(session))?;
            return Ok(SearchReport::NotTriggered);
        }

        let criteria = intent::extract(user_text);
        if criteria.is_empty() {
            tracing::debug!(session = %session, "Search triggered but no criteria extracted");
            update(&self.state, |s| s.send_finished(session))?;
            return Ok(SearchReport::NoCriteria);
        }

        update(&self.state, |s| s.search_started(session))?;
        match self.search.search(&criteria).await {
            Ok(outcome) => {
                let count = outcome.count();
                let (applied, _) = update(&self.state, |s| s.search_completed(session, outcome))?;
                match applied {
                    Completion::Stale => {
                        tracing::debug!(session = %session, "Discarding search results for inactive session");
                        Ok(SearchReport::Discarded)
                    }
                    Completion::Applied if count > 0 => Ok(SearchReport::Found(count)),
                    Completion::Applied => Ok(SearchReport::NotFound),
                }
            }
            Err(e) => {
                tracing::warn!(session = %session, error = %e, "Product search failed; abandoning");
                update(&self.state, |s| s.search_abandoned(session))?;
                Ok(SearchReport::Abandoned)
            }
        }
    }
}

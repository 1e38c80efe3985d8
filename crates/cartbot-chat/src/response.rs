//! Locally synthesized bot messages.
//!
//! These never come from the backend; they summarise a product search
//! outcome in the conversation.

use cartbot_core::types::Message;

use crate::search::SearchOutcome;

/// Substring of a bot reply that triggers a product search.
pub const TRIGGER_PHRASE: &str = "Here are some products";

/// Shown when a search returns nothing.
pub const NO_MATCHES: &str =
    "I couldn't find any products matching your criteria. Try different search terms.";

/// Whether a bot reply asks the client to run a product search.
pub fn is_search_trigger(bot_content: &str) -> bool {
    bot_content.contains(TRIGGER_PHRASE)
}

/// Text summarising a search outcome.
pub fn search_summary(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::Found(products) => format!(
            "I found {} products matching your criteria. Here are some options:",
            products.len()
        ),
        SearchOutcome::NotFound => NO_MATCHES.to_string(),
    }
}

/// A bot-styled message with a local id and timestamp.
pub fn search_summary_message(outcome: &SearchOutcome) -> Message {
    Message::local(search_summary(outcome), true)
}

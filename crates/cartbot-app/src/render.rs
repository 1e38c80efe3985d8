//! Plain-text rendering of the chat state.
//!
//! Every function here is a pure function of its input, so the terminal
//! front end only decides *when* to print.

use cartbot_chat::state::{ChatState, Delivery, LogEntry};
use cartbot_core::types::{Product, Session};

/// Shown in place of an empty message log.
pub const WELCOME: &str = "\
Welcome to the Cartbot shopping assistant!
Start by asking about products you're interested in, like:
  \"Show me laptops under $1000\"
  \"What books do you have?\"
  \"I'm looking for red shirts\"";

pub const HELP: &str = "\
Commands:
  /new            start a new chat session
  /sessions       list your sessions
  /switch <n>     open session number n from /sessions
  /products       show the last product results
  /categories     list product categories
  /help           show this help
  /quit           leave
Anything else is sent as a message.";

const DESCRIPTION_PREVIEW_CHARS: usize = 60;

/// Sidebar label for a session.
pub fn session_label(session: &Session) -> String {
    format!("Chat {}", session.created_at.format("%Y-%m-%d"))
}

/// Numbered session list with the active one marked.
pub fn render_sessions(state: &ChatState) -> String {
    if state.sessions().is_empty() {
        return "No sessions yet. Type /new to start one.".to_string();
    }
    state
        .sessions()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let marker = if state.active_session() == Some(s.id) {
                '*'
            } else {
                ' '
            };
            format!(
                "{} {:>2}. {}  ({})",
                marker,
                i + 1,
                session_label(s),
                s.last_activity().format("%H:%M:%S")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One log line: time, speaker, content and delivery marker.
pub fn render_entry(entry: &LogEntry) -> String {
    let msg = &entry.message;
    let speaker = if msg.is_bot { "bot" } else { "you" };
    let marker = match entry.delivery {
        Delivery::Confirmed => "",
        Delivery::Pending => " (sending...)",
        Delivery::Failed => " (failed to send)",
    };
    format!(
        "[{}] {}: {}{}",
        msg.timestamp.format("%H:%M:%S"),
        speaker,
        msg.content,
        marker
    )
}

/// The whole message log, or the welcome text when it is empty.
pub fn render_messages(state: &ChatState) -> String {
    if state.messages().is_empty() {
        return WELCOME.to_string();
    }
    state
        .messages()
        .iter()
        .map(render_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_product(product: &Product) -> String {
    let mut description: String = product
        .description
        .chars()
        .take(DESCRIPTION_PREVIEW_CHARS)
        .collect();
    if product.description.chars().count() > DESCRIPTION_PREVIEW_CHARS {
        description.push_str("...");
    }
    format!(
        "  - {}  ${:.2}  [{}]  in stock: {}\n    {}",
        product.name, product.price, product.category, product.stock, description
    )
}

/// The product panel, or `None` while it is hidden.
pub fn render_products(state: &ChatState) -> Option<String> {
    if !state.show_products() {
        return None;
    }
    let mut out = String::from("Recommended Products");
    for product in state.products() {
        out.push('\n');
        out.push_str(&render_product(product));
    }
    Some(out)
}

pub fn render_categories(state: &ChatState) -> String {
    if state.categories().is_empty() {
        "No categories available.".to_string()
    } else {
        format!("Categories: {}", state.categories().join(", "))
    }
}

/// Full screen: sessions, log and product panel.
pub fn render(state: &ChatState) -> String {
    let mut sections = vec![render_sessions(state), render_messages(state)];
    if let Some(products) = render_products(state) {
        sections.push(products);
    }
    sections.join("\n\n")
}

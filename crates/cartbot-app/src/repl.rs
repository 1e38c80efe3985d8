//! Interactive line-based chat loop.

use tokio::io::{AsyncBufReadExt, BufReader};

use cartbot_chat::pipeline::{SearchReport, SendOutcome};
use cartbot_chat::{ChatError, ChatOrchestrator};
use cartbot_core::types::SessionId;

use crate::render;

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    NewSession,
    ListSessions,
    /// 1-based position in the session list.
    Switch(usize),
    Products,
    Categories,
    Help,
    Quit,
    Send(String),
    Empty,
    Invalid(String),
}

pub fn parse_line(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ReplCommand::Send(line.trim_end_matches(['\r', '\n']).to_string());
    };
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or("");
    let arg = parts.next();
    match (name, arg) {
        ("new", None) => ReplCommand::NewSession,
        ("sessions", None) => ReplCommand::ListSessions,
        ("switch", Some(n)) => match n.parse::<usize>() {
            Ok(n) if n > 0 => ReplCommand::Switch(n),
            _ => ReplCommand::Invalid(format!("not a session number: {}", n)),
        },
        ("switch", None) => ReplCommand::Invalid("usage: /switch <n>".to_string()),
        ("products", None) => ReplCommand::Products,
        ("categories", None) => ReplCommand::Categories,
        ("help", _) => ReplCommand::Help,
        ("quit", _) | ("exit", _) => ReplCommand::Quit,
        _ => ReplCommand::Invalid(format!("unknown command: /{}", rest)),
    }
}

/// Initial load, then the requested session if any.
///
/// Failures are logged and leave whatever loaded in place, so the loop
/// still starts and `/sessions` can retry.
pub async fn open(orch: &ChatOrchestrator, session: Option<SessionId>) {
    if let Err(e) = orch.mount().await {
        tracing::error!(error = %e, "Initial load failed; type /sessions to retry");
    }
    if let Some(id) = session {
        if let Err(e) = orch.select_session(id).await {
            tracing::error!(session = %id, error = %e, "Could not open session");
        }
    }
}

/// Run the chat loop on stdin until `/quit` or end of input.
pub async fn run(orch: &ChatOrchestrator) -> Result<(), ChatError> {
    if let Some(user) = orch.current_user() {
        println!("Signed in as {}.\n", user.username);
    }
    println!("{}", render::render(&orch.snapshot()?));
    println!("\nType /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                break;
            }
        };
        match parse_line(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Empty => {}
            command => {
                if let Err(e) = handle(orch, command).await {
                    println!("! {}", e);
                }
            }
        }
    }
    Ok(())
}

async fn handle(orch: &ChatOrchestrator, command: ReplCommand) -> Result<(), ChatError> {
    match command {
        ReplCommand::NewSession => {
            orch.create_session().await?;
            println!("{}", render::render_messages(&orch.snapshot()?));
        }
        ReplCommand::ListSessions => {
            orch.refresh_sessions().await?;
            println!("{}", render::render_sessions(&orch.snapshot()?));
        }
        ReplCommand::Switch(n) => {
            let target = orch.snapshot()?.sessions().get(n - 1).map(|s| s.id);
            match target {
                Some(id) => {
                    orch.select_session(id).await?;
                    println!("{}", render::render_messages(&orch.snapshot()?));
                }
                None => println!("! no session number {}", n),
            }
        }
        ReplCommand::Products => match render::render_products(&orch.snapshot()?) {
            Some(panel) => println!("{}", panel),
            None => println!("No products to show."),
        },
        ReplCommand::Categories => {
            println!("{}", render::render_categories(&orch.snapshot()?));
        }
        ReplCommand::Help => println!("{}", render::HELP),
        ReplCommand::Invalid(reason) => println!("! {}", reason),
        ReplCommand::Send(text) => send(orch, &text).await?,
        ReplCommand::Quit | ReplCommand::Empty => {}
    }
    Ok(())
}

async fn send(orch: &ChatOrchestrator, text: &str) -> Result<(), ChatError> {
    if orch.snapshot()?.active_session().is_none() {
        println!("! no active session, type /new to start one");
        return Ok(());
    }
    match orch.send_message(text).await? {
        SendOutcome::Delivered { receipt, search } => {
            let state = orch.snapshot()?;
            // Everything after the confirmed user message belongs to this exchange.
            let start = state
                .messages()
                .iter()
                .position(|e| e.message.id == receipt.user_message.id)
                .map(|i| i + 1)
                .unwrap_or(state.messages().len());
            for entry in &state.messages()[start..] {
                println!("{}", render::render_entry(entry));
            }
            if let SearchReport::Found(_) = search {
                if let Some(panel) = render::render_products(&state) {
                    println!("\n{}", panel);
                }
            }
        }
        SendOutcome::Skipped => {}
        SendOutcome::Discarded => println!("(reply arrived for another session)"),
    }
    Ok(())
}

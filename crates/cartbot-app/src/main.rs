//! Cartbot binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing (stderr, so chat output stays clean)
//! 3. Dispatch the subcommand: account flows, criteria extraction, or the
//!    interactive chat wired to the HTTP backend

mod cli;
mod render;
mod repl;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cartbot_chat::auth::{AccountClient, AuthProvider, TokenAuth, TokenStore};
use cartbot_chat::backend::HttpBackend;
use cartbot_chat::{intent, ChatOrchestrator};
use cartbot_core::config::CartbotConfig;
use cartbot_core::types::SessionId;

use cli::{CliArgs, Command};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Use the `--password` value, or prompt for one on stdin.
fn password_or_prompt(password: Option<String>) -> AppResult<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn register(config: &CartbotConfig, username: &str, password: Option<String>) -> AppResult<()> {
    let password = password_or_prompt(password)?;
    let client = AccountClient::new(&config.backend)?;
    let message = client.register(username, &password).await?;
    println!("{}", message);
    Ok(())
}

async fn login(
    config: &CartbotConfig,
    store: &TokenStore,
    username: &str,
    password: Option<String>,
) -> AppResult<()> {
    let password = password_or_prompt(password)?;
    let client = AccountClient::new(&config.backend)?;
    let credentials = client.login(username, &password).await?;
    store.save(&credentials)?;
    println!("Signed in as {}.", credentials.user.username);
    Ok(())
}

async fn chat(config: &CartbotConfig, store: &TokenStore, session: Option<i64>) -> AppResult<()> {
    let Some(credentials) = store.load()? else {
        println!("Not signed in. Run `cartbot login <username>` first.");
        return Ok(());
    };
    let auth: Arc<dyn AuthProvider> = Arc::new(TokenAuth::new(credentials));
    let backend = Arc::new(HttpBackend::new(&config.backend, Arc::clone(&auth))?);
    tracing::info!(base_url = %backend.base_url(), "Connecting to chat backend");

    let orch = ChatOrchestrator::new(backend, auth);
    repl::open(&orch, session.map(SessionId)).await;
    repl::run(&orch).await?;
    Ok(())
}

fn extract(text: &[String]) -> AppResult<()> {
    let criteria = intent::extract(&text.join(" "));
    println!("{}", serde_json::to_string_pretty(&criteria)?);
    Ok(())
}

fn init_config(config: &CartbotConfig, path: &Path, force: bool) -> AppResult<()> {
    if path.exists() && !force {
        println!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
        return Ok(());
    }
    config.save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    // Config, before tracing so the file can set the log level.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = if config_file.exists() {
        match CartbotConfig::load(&config_file) {
            Ok(c) => (c, None),
            Err(e) => (CartbotConfig::default(), Some(e)),
        }
    } else {
        (CartbotConfig::default(), None)
    };
    config.apply_env_overrides();
    args.apply_overrides(&mut config);

    // Tracing. RUST_LOG wins over every other source.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::debug!("Starting Cartbot v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config. Using defaults."
        ),
        None => tracing::debug!(path = %config_file.display(), "Configuration resolved"),
    }

    let store = TokenStore::in_dir(&config.general.resolved_data_dir());

    match args.command() {
        Command::Register { username, password } => register(&config, &username, password).await,
        Command::Login { username, password } => login(&config, &store, &username, password).await,
        Command::Logout => {
            store.clear()?;
            println!("Signed out.");
            Ok(())
        }
        Command::Chat { session } => chat(&config, &store, session).await,
        Command::Extract { text } => extract(&text),
        Command::InitConfig { force } => init_config(&config, &config_file, force),
    }
}

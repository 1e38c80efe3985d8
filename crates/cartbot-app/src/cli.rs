//! CLI argument definitions for the Cartbot client.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cartbot_core::config::CartbotConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CARTBOT_CONFIG";

/// Cartbot: a conversational shopping assistant for the terminal.
#[derive(Parser, Debug)]
#[command(name = "cartbot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Backend API base URL, e.g. http://localhost:5000/api.
    #[arg(short = 'u', long = "base-url")]
    pub base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account on the backend.
    Register {
        username: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in and save the token for later runs.
    Login {
        username: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the saved token.
    Logout,
    /// Start an interactive chat (the default).
    Chat {
        /// Open this session id instead of the most recent one.
        #[arg(long)]
        session: Option<i64>,
    },
    /// Print the search criteria extracted from TEXT.
    Extract {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Write the effective configuration to the config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl CliArgs {
    /// The subcommand to run, `chat` when none was given.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Chat { session: None })
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CARTBOT_CONFIG env var > ~/.cartbot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply flag overrides on top of a loaded (and env-overridden) config.
    pub fn apply_overrides(&self, config: &mut CartbotConfig) {
        if let Some(ref url) = self.base_url {
            config.backend.base_url = url.clone();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".cartbot").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".cartbot").join("config.toml");
    }
    PathBuf::from("config.toml")
}

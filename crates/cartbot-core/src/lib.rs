//! Shared domain types, configuration and errors for Cartbot.

pub mod config;
pub mod error;
pub mod types;

pub use config::CartbotConfig;
pub use error::{CartbotError, Result};
pub use types::*;

use thiserror::Error;

/// Top-level error type shared by the Cartbot crates.
///
/// Subsystem crates define their own error types and implement
/// `From<CartbotError>` so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CartbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CartbotError {
    fn from(err: toml::de::Error) -> Self {
        CartbotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CartbotError {
    fn from(err: toml::ser::Error) -> Self {
        CartbotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CartbotError {
    fn from(err: serde_json::Error) -> Self {
        CartbotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Cartbot operations.
pub type Result<T> = std::result::Result<T, CartbotError>;

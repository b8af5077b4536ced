//! Error types shared across ODIN crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, OdinError>;

/// Main error type for the common crate
#[derive(Error, Debug)]
pub enum OdinError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OdinError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

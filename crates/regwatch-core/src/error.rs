//! Error types for the regwatch system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for regwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the regwatch system
#[derive(Error, Debug)]
pub enum Error {
    /// Registry API errors (transport failures, server errors)
    #[error("registry error: {0}")]
    Registry(String),

    /// Registry authentication errors
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Repository or tag does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// State store errors
    #[error("state store error: {0}")]
    StateStore(String),

    /// Notification delivery errors
    #[error("notification error: {0}")]
    Notify(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a notification error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error means the repository or tag does not exist,
    /// as opposed to a transport or server failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

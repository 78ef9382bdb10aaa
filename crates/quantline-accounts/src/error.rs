//! Error types for account management.

use thiserror::Error;

/// Errors that can occur in account operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A field-level validation failure on an account (channel, token,
    /// url, instance).
    #[error("{0}")]
    InvalidAccount(String),

    /// Proxy misconfiguration. Kept distinct from [`Error::InvalidAccount`]
    /// so callers can tell proxy problems apart from credential problems.
    #[error("Invalid proxy configuration: {0}")]
    InvalidConfiguration(String),

    /// No stored profile matched the requested name or criterion.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// A save collided with an existing profile name and `overwrite` was
    /// not set.
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a field-level account validation error for `field`.
    #[must_use]
    pub fn invalid_field(field: &str) -> Self {
        Self::InvalidAccount(format!("Invalid `{field}` value."))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

//! Common error types for Mothra

use thiserror::Error;

/// Common result type for Mothra operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Mothra components
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or invalid component parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Parameter present but in a shape the component cannot handle
    #[error("Unsupported input: {0}")]
    Unsupported(String),

    /// Untrusted script rejected by the input security check
    #[error("Rejected input: {0}")]
    RejectedInput(String),

    /// External ILP engine failed to run or produced no result
    #[error("Engine error: {0}")]
    Engine(String),

    /// Remote web service failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// True for errors caused by the caller's parameters rather than by a collaborator
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::Unsupported(_) | Error::RejectedInput(_)
        )
    }
}

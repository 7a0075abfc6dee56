//! Error types for shelf-core

use thiserror::Error;

/// Result type alias using shelf-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shelf-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local storage transaction failed
    #[error("Storage unavailable: {0}")]
    Storage(#[from] libsql::Error),

    /// A record with this id already exists
    #[error("Duplicate record id: {0}")]
    DuplicateId(String),

    /// Record or setting not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote write precondition failed (the content token is stale)
    #[error("Remote write conflict: {0}")]
    Conflict(String),

    /// The remote rejected our credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Transport-level failure or timeout talking to the remote
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote responded, but the body is not a catalog document
    #[error("Invalid remote document: {0}")]
    InvalidRemoteFormat(String),
}

impl Error {
    /// Whether retrying the same call later may succeed.
    ///
    /// Only transport failures qualify; conflicts have their own retry path
    /// and authorization or format errors will not fix themselves.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidRemoteFormat(error.to_string())
        } else if error.is_timeout() {
            Self::RemoteUnavailable(format!("request timed out: {error}"))
        } else {
            Self::RemoteUnavailable(error.to_string())
        }
    }
}

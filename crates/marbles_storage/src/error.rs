//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while talking to the key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A predicate query expression could not be evaluated.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of what is wrong with the expression.
        message: String,
    },

    /// A store snapshot could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }
}

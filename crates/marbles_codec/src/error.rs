//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while building or splitting composite keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A segment contains a character that cannot be encoded.
    #[error("invalid segment {segment:?}: {message}")]
    InvalidSegment {
        /// The offending segment.
        segment: String,
        /// Description of the problem.
        message: String,
    },

    /// The index name is empty.
    #[error("index name must not be empty")]
    EmptyIndexName,

    /// The key is not a well-formed composite key.
    #[error("malformed composite key: {message}")]
    MalformedKey {
        /// Description of the problem.
        message: String,
    },
}

impl CodecError {
    /// Create an invalid segment error.
    pub fn invalid_segment(segment: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSegment {
            segment: segment.into(),
            message: message.into(),
        }
    }

    /// Create a malformed key error.
    pub fn malformed_key(message: impl Into<String>) -> Self {
        Self::MalformedKey {
            message: message.into(),
        }
    }
}

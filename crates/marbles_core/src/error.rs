//! Error types for the registry core.

use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The kind of record a lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A marble in the general collection.
    Marble,
    /// The private details of a marble.
    PrivateDetails,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marble => f.write_str("marble"),
            Self::PrivateDetails => f.write_str("marble private details"),
        }
    }
}

/// Errors that can occur in registry operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Key-value store error.
    #[error("storage error: {0}")]
    Store(#[from] marbles_storage::StorageError),

    /// Composite key codec error.
    #[error("codec error: {0}")]
    Codec(#[from] marbles_codec::CodecError),

    /// A transient key is absent or its value is empty.
    #[error("{key} must be a key in the transient map with a non-empty JSON value")]
    MissingField {
        /// The transient key that was expected.
        key: String,
    },

    /// A transient payload does not have the expected shape.
    #[error("failed to decode JSON of transient {key}: {message}")]
    MalformedInput {
        /// The transient key holding the payload.
        key: String,
        /// Decoder message.
        message: String,
    },

    /// A decoded input field failed validation.
    #[error("{field} field {message}")]
    InvalidField {
        /// Name of the field.
        field: &'static str,
        /// What the field must satisfy.
        message: &'static str,
    },

    /// Wrong number of positional arguments.
    #[error("incorrect number of arguments: expecting {expected}, got {actual}")]
    InvalidArguments {
        /// Description of the expected arguments.
        expected: &'static str,
        /// Number of arguments received.
        actual: usize,
    },

    /// The requested function does not exist.
    #[error("received unknown function invocation: {name}")]
    UnknownFunction {
        /// Name that was invoked.
        name: String,
    },

    /// A marble with this name already exists.
    #[error("this marble already exists: {name}")]
    AlreadyExists {
        /// The marble name.
        name: String,
    },

    /// The requested record does not exist.
    #[error("{kind} does not exist: {name}")]
    NotFound {
        /// What was looked up.
        kind: RecordKind,
        /// The record name.
        name: String,
    },

    /// Stored bytes are not a valid record.
    #[error("failed to decode stored record: {message}")]
    Decode {
        /// Description of the problem.
        message: String,
    },

    /// A record could not be encoded.
    #[error("failed to encode record: {message}")]
    Encoding {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a missing field error.
    pub fn missing_field(key: impl Into<String>) -> Self {
        Self::MissingField { key: key.into() }
    }

    /// Creates a malformed input error.
    pub fn malformed_input(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(kind: RecordKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the caller's input.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. }
                | Self::MalformedInput { .. }
                | Self::InvalidField { .. }
                | Self::InvalidArguments { .. }
                | Self::UnknownFunction { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_record() {
        let err = CoreError::not_found(RecordKind::PrivateDetails, "m1");
        assert_eq!(err.to_string(), "marble private details does not exist: m1");

        let err = CoreError::InvalidField {
            field: "size",
            message: "must be a positive integer",
        };
        assert_eq!(err.to_string(), "size field must be a positive integer");
    }

    #[test]
    fn caller_errors_are_classified() {
        assert!(CoreError::missing_field("marble").is_caller_error());
        assert!(!CoreError::decode("bad").is_caller_error());
        assert!(!CoreError::AlreadyExists { name: "m1".into() }.is_caller_error());
    }
}

//! Error types and result types for document store operations.
//!
//! Every failure is reported at its point of origin and handed back to the caller
//! unchanged: the facade performs no retries and adds no context of its own.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use std::time::Duration;

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The client could not be constructed (malformed address) or the connection
    /// attempt was rejected or did not complete in time.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A document could not be converted to or from the wire encoding.
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// The given string is not a well-formed document identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// The store rejected the operation (network failure, constraint violation,
    /// unsupported update operator, ...).
    #[error("Store error: {0}")]
    Store(String),
    /// The call scope elapsed before the store answered. The in-flight operation
    /// was abandoned; whether it landed on the store side is unknown.
    #[error("Operation `{operation}` timed out after {after:?}")]
    Timeout {
        /// Name of the facade operation that timed out.
        operation: &'static str,
        /// The scope's configured timeout.
        after: Duration,
    },
}

impl DocumentStoreError {
    /// Returns `true` for failures reported by, or while waiting on, the store.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Timeout { .. })
    }

    /// Returns `true` if the call scope elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Encoding(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Encoding(err.to_string())
    }
}

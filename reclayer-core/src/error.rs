//! Error types and result types for collection store operations.
//!
//! A missing record is never an error: [`CollectionStore::get`](crate::collection::CollectionStore::get)
//! reports absence as `Ok(None)`. Everything else that can go wrong is a
//! [`CollectionStoreError`], returned through [`CollectionStoreResult<T>`].

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::record::RecordId;

/// Represents all possible errors that can occur when interacting with a record collection.
///
/// The in-memory backend can only produce [`InvalidArgument`](Self::InvalidArgument);
/// the remaining variants come from persistent backends or from encoding records.
#[derive(Error, Debug)]
pub enum CollectionStoreError {
    /// The caller passed an argument the store cannot honour, such as an upsert
    /// whose record id does not match the id it is written under.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Stored data for a record could not be decoded.
    #[error("Corrupt record {id} in collection {collection}: {reason}")]
    CorruptRecord {
        collection: String,
        id: String,
        reason: String,
    },
    /// The backend could not be reached (connection refused, dropped, timed out).
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    /// The backend was reachable but rejected the operation.
    #[error("Backend error: {0}")]
    Backend(String),
    /// A record could not be encoded into its storage representation.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend construction or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl CollectionStoreError {
    /// Builds a [`CorruptRecord`](Self::CorruptRecord) error for a record id.
    pub fn corrupt(collection: &str, id: RecordId, reason: impl ToString) -> Self {
        Self::corrupt_key(collection, id.to_string(), reason)
    }

    /// Builds a [`CorruptRecord`](Self::CorruptRecord) error for a raw storage key
    /// or index entry that could not be mapped to a record id.
    pub fn corrupt_key(collection: &str, key: impl Into<String>, reason: impl ToString) -> Self {
        Self::CorruptRecord {
            collection: collection.to_string(),
            id: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` for errors caused by unreadable stored data.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptRecord { .. })
    }

    /// Returns `true` for connectivity failures.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }
}

/// A specialized `Result` type for collection store operations.
pub type CollectionStoreResult<T> = Result<T, CollectionStoreError>;

impl From<BsonError> for CollectionStoreError {
    fn from(err: BsonError) -> Self {
        CollectionStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for CollectionStoreError {
    fn from(err: SerdeJsonError) -> Self {
        CollectionStoreError::Serialization(err.to_string())
    }
}

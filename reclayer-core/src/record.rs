//! Core traits for record representation and serialization.
//!
//! Every value stored in a collection implements [`Record`]. Records are plain
//! value types: the store hands out independent copies and only changes its
//! canonical copy when a record is written back through an upsert.

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::CollectionStoreResult;

/// Integer identity of a record, unique within its collection.
pub type RecordId = i64;

/// Core trait that all records stored in a collection must implement.
///
/// # Example
///
/// ```ignore
/// use reclayer::record::{Record, RecordId};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Note {
///     pub id: RecordId,
///     pub body: String,
/// }
///
/// impl Record for Note {
///     fn id(&self) -> RecordId {
///         self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "notes"
///     }
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns this record's identity. Immutable once assigned.
    fn id(&self) -> RecordId;

    /// Returns the name of the collection this record type lives in.
    fn collection_name() -> &'static str;
}

/// Extension trait converting records to and from their storage (BSON) and
/// transport (JSON) representations.
///
/// Automatically implemented for every [`Record`].
pub trait RecordExt: Record {
    /// Converts this record to a BSON value for storage.
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if the record cannot be encoded.
    fn to_bson(&self) -> CollectionStoreResult<Bson>;

    /// Creates a record from a stored BSON value.
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if the value does not match the record's shape.
    fn from_bson(bson: Bson) -> CollectionStoreResult<Self>;

    /// Converts this record to a JSON value.
    fn to_json(&self) -> CollectionStoreResult<Value>;

    /// Creates a record from a JSON value.
    fn from_json(value: Value) -> CollectionStoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn to_bson(&self) -> CollectionStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> CollectionStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> CollectionStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> CollectionStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

//! Record encoding for key-value storage.
//!
//! Records are stored as BSON document bytes. BSON keeps field names and the
//! distinction between booleans, 32/64-bit integers and strings, so a record
//! read back is identical to the one written.

use bson::{Bson, Document, de::deserialize_from_slice, ser::serialize_to_vec};

use reclayer_core::{
    error::{CollectionStoreError, CollectionStoreResult},
    record::RecordId,
};

/// Encodes a record document into bytes.
pub fn encode(record: &Bson) -> CollectionStoreResult<Vec<u8>> {
    match record {
        Bson::Document(doc) => Ok(serialize_to_vec(doc)?),
        other => Err(CollectionStoreError::Serialization(format!(
            "records must encode to a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Decodes stored bytes back into a record document.
///
/// Bytes that are not a well-formed BSON document are reported as a corrupt record.
pub fn decode(collection: &str, id: RecordId, bytes: &[u8]) -> CollectionStoreResult<Bson> {
    deserialize_from_slice::<Document>(bytes)
        .map(Bson::Document)
        .map_err(|err| CollectionStoreError::corrupt(collection, id, err))
}

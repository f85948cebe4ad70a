//! Typed collection handle exposing the six store operations.
//!
//! A [`CollectionStore`] is a cheap, borrowed view of one named collection inside a
//! [`RecordStore`](crate::store::RecordStore). It encodes records on the way in,
//! decodes them on the way out, and validates ids before anything reaches the backend.
//!
//! # Example
//!
//! ```ignore
//! use reclayer::{prelude::*, memory::InMemoryStore, todo::Todo};
//!
//! # async fn example() -> CollectionStoreResult<()> {
//! let store = RecordStore::new(InMemoryStore::new());
//! let todos = store.collection::<Todo>();
//!
//! let id = todos.next_key().await?;
//! todos.update(id, Todo::new(id, "buy milk")).await?;
//! assert_eq!(todos.get_all().await?.len(), 1);
//! # Ok(()) }
//! ```

use std::marker::PhantomData;
use tracing::warn;

use crate::{
    backend::StoreBackend,
    error::{CollectionStoreError, CollectionStoreResult},
    record::{Record, RecordExt, RecordId},
};

/// A typed view of a single collection.
///
/// Callers always receive independent copies of stored records; mutating a
/// returned value has no effect until it is written back with [`update`](Self::update).
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
/// * `R` - The record type stored in the collection
#[derive(Debug)]
pub struct CollectionStore<'a, B: StoreBackend, R: Record> {
    name: String,
    backend: &'a B,
    _marker: PhantomData<R>,
}

impl<'a, B: StoreBackend, R: Record> CollectionStore<'a, B, R> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the record stored under `id`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`CorruptRecord`](CollectionStoreError::CorruptRecord) if the stored data
    /// cannot be decoded, or a backend error if the backend could not be read.
    pub async fn get(&self, id: RecordId) -> CollectionStoreResult<Option<R>> {
        self.backend
            .get_record(&self.name, id)
            .await?
            .map(|doc| self.decode(id, doc))
            .transpose()
    }

    /// Creates or fully replaces the record stored under `id` and returns the stored value.
    ///
    /// Upserting an id that was never allocated through [`next_key`](Self::next_key) is
    /// allowed and creates the record.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`](CollectionStoreError::InvalidArgument) if `value.id()`
    /// differs from `id`. Nothing is written in that case.
    pub async fn update(&self, id: RecordId, value: R) -> CollectionStoreResult<R> {
        if value.id() != id {
            return Err(CollectionStoreError::InvalidArgument(format!(
                "record id {} does not match key {} in collection {}",
                value.id(),
                id,
                self.name,
            )));
        }

        let stored = self
            .backend
            .put_record(&self.name, id, value.to_bson()?)
            .await?;

        self.decode(id, stored)
    }

    /// Removes the record stored under `id`. Removing a missing record is not an error.
    pub async fn delete(&self, id: RecordId) -> CollectionStoreResult<()> {
        self.backend.delete_record(&self.name, id).await
    }

    /// Removes every record in the collection.
    pub async fn delete_all(&self) -> CollectionStoreResult<()> {
        self.backend.delete_all_records(&self.name).await
    }

    /// Returns every record in the collection, in no particular order.
    ///
    /// # Errors
    ///
    /// Fails with [`CorruptRecord`](CollectionStoreError::CorruptRecord) on the first
    /// stored record that cannot be decoded. Use [`get_all_lenient`](Self::get_all_lenient)
    /// to skip such records instead.
    pub async fn get_all(&self) -> CollectionStoreResult<Vec<R>> {
        self.backend
            .get_all_records(&self.name)
            .await?
            .into_iter()
            .map(|(id, doc)| self.decode(id, doc))
            .collect()
    }

    /// Returns every decodable record in the collection, logging and skipping corrupt ones.
    pub async fn get_all_lenient(&self) -> CollectionStoreResult<Vec<R>> {
        Ok(self
            .backend
            .get_all_records(&self.name)
            .await?
            .into_iter()
            .filter_map(|(id, doc)| match self.decode(id, doc) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(collection = %self.name, id, error = %err, "skipping corrupt record");
                    None
                }
            })
            .collect())
    }

    /// Allocates a new, never before issued id for this collection.
    pub async fn next_key(&self) -> CollectionStoreResult<RecordId> {
        self.backend.next_key(&self.name).await
    }

    /// Allocates a key with [`next_key`](Self::next_key) and upserts the record `build` makes for it.
    pub async fn create<F>(&self, build: F) -> CollectionStoreResult<R>
    where
        F: FnOnce(RecordId) -> R + Send,
    {
        let id = self.next_key().await?;

        self.update(id, build(id)).await
    }

    fn decode(&self, id: RecordId, doc: bson::Bson) -> CollectionStoreResult<R> {
        R::from_bson(doc).map_err(|err| CollectionStoreError::corrupt(&self.name, id, err))
    }
}

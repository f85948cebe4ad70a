//! Storage backend abstraction for record collections.
//!
//! This module defines the traits that abstract over storage implementations, allowing a
//! [`RecordStore`](crate::store::RecordStore) to run against a volatile in-process map or a
//! persistent key-value store with identical semantics.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: An object-safe mirror used when the backend is chosen at runtime
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! Backends work on untyped BSON documents. Typing, id validation and decoding into
//! concrete records happen one layer up, in [`CollectionStore`](crate::collection::CollectionStore).

use async_trait::async_trait;
use bson::Bson;
use std::{any::Any, fmt::Debug};

use crate::{error::CollectionStoreResult, record::RecordId};

/// Abstract interface for record storage backends.
///
/// Every method addresses a single named collection. Collections need not be
/// created up front; an operation on a collection that has never been written
/// behaves as if the collection were empty.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and safe to call from many tasks at once.
/// Operations against different ids are independent. Only [`next_key`](Self::next_key)
/// carries a cross-caller guarantee: concurrent calls never return the same id.
///
/// # Cancellation
///
/// Dropping a returned future abandons the call. Implementations must not leave a
/// partially written record behind when that happens; a write is applied whole or
/// not at all at the granularity of a single backend call.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Fetches the stored document for `id`, or `None` if no such record exists.
    async fn get_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<Option<Bson>>;

    /// Creates or fully replaces the document stored under `id`.
    ///
    /// Returns the document exactly as persisted. Once this resolves, a subsequent
    /// [`get_record`](Self::get_record) observes the write.
    async fn put_record(
        &self,
        collection: &str,
        id: RecordId,
        record: Bson,
    ) -> CollectionStoreResult<Bson>;

    /// Removes the record stored under `id`. Removing a missing id is a no-op.
    async fn delete_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<()>;

    /// Removes every record in the collection. Succeeds on an empty collection.
    async fn delete_all_records(&self, collection: &str) -> CollectionStoreResult<()>;

    /// Returns every live record as `(id, document)` pairs, in no particular order.
    async fn get_all_records(&self, collection: &str) -> CollectionStoreResult<Vec<(RecordId, Bson)>>;

    /// Allocates a new identity for the collection.
    ///
    /// The returned id is not in use and has never been issued before for this
    /// collection over the backend's lifetime.
    async fn next_key(&self, collection: &str) -> CollectionStoreResult<RecordId>;

    /// Cleanly shuts down the backend, releasing connections and other resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> CollectionStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn get_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<Option<Bson>> {
        (*self).get_record(collection, id).await
    }

    async fn put_record(
        &self,
        collection: &str,
        id: RecordId,
        record: Bson,
    ) -> CollectionStoreResult<Bson> {
        (*self)
            .put_record(collection, id, record)
            .await
    }

    async fn delete_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<()> {
        (*self).delete_record(collection, id).await
    }

    async fn delete_all_records(&self, collection: &str) -> CollectionStoreResult<()> {
        (*self).delete_all_records(collection).await
    }

    async fn get_all_records(&self, collection: &str) -> CollectionStoreResult<Vec<(RecordId, Bson)>> {
        (*self).get_all_records(collection).await
    }

    async fn next_key(&self, collection: &str) -> CollectionStoreResult<RecordId> {
        (*self).next_key(collection).await
    }
}

/// Object-safe counterpart of [`StoreBackend`].
///
/// Implemented for every `StoreBackend`, so any backend can be boxed as
/// `Box<dyn DynStoreBackend>` and picked at construction time from configuration.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn get_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<Option<Bson>>;
    async fn put_record(
        &self,
        collection: &str,
        id: RecordId,
        record: Bson,
    ) -> CollectionStoreResult<Bson>;
    async fn delete_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<()>;
    async fn delete_all_records(&self, collection: &str) -> CollectionStoreResult<()>;
    async fn get_all_records(&self, collection: &str) -> CollectionStoreResult<Vec<(RecordId, Bson)>>;
    async fn next_key(&self, collection: &str) -> CollectionStoreResult<RecordId>;
    async fn shutdown_boxed(self: Box<Self>) -> CollectionStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn get_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<Option<Bson>> {
        StoreBackend::get_record(self, collection, id).await
    }

    async fn put_record(
        &self,
        collection: &str,
        id: RecordId,
        record: Bson,
    ) -> CollectionStoreResult<Bson> {
        StoreBackend::put_record(self, collection, id, record).await
    }

    async fn delete_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<()> {
        StoreBackend::delete_record(self, collection, id).await
    }

    async fn delete_all_records(&self, collection: &str) -> CollectionStoreResult<()> {
        StoreBackend::delete_all_records(self, collection).await
    }

    async fn get_all_records(&self, collection: &str) -> CollectionStoreResult<Vec<(RecordId, Bson)>> {
        StoreBackend::get_all_records(self, collection).await
    }

    async fn next_key(&self, collection: &str) -> CollectionStoreResult<RecordId> {
        StoreBackend::next_key(self, collection).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> CollectionStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn get_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<Option<Bson>> {
        DynStoreBackend::get_record(&**self, collection, id).await
    }

    async fn put_record(
        &self,
        collection: &str,
        id: RecordId,
        record: Bson,
    ) -> CollectionStoreResult<Bson> {
        DynStoreBackend::put_record(&**self, collection, id, record).await
    }

    async fn delete_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<()> {
        DynStoreBackend::delete_record(&**self, collection, id).await
    }

    async fn delete_all_records(&self, collection: &str) -> CollectionStoreResult<()> {
        DynStoreBackend::delete_all_records(&**self, collection).await
    }

    async fn get_all_records(&self, collection: &str) -> CollectionStoreResult<Vec<(RecordId, Bson)>> {
        DynStoreBackend::get_all_records(&**self, collection).await
    }

    async fn next_key(&self, collection: &str) -> CollectionStoreResult<RecordId> {
        DynStoreBackend::next_key(&**self, collection).await
    }

    async fn shutdown(self) -> CollectionStoreResult<()> {
        DynStoreBackend::shutdown_boxed(self).await
    }
}

/// Factory for backend instances.
///
/// Builders carry a backend's configuration and perform any asynchronous setup
/// (connecting, handshakes) in [`build`](Self::build).
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> CollectionStoreResult<Self::Backend>;
}

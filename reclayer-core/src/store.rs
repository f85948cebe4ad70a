//! Main record store interface.
//!
//! - [`RecordStore`] - Store bound to a concrete backend type
//! - [`DynRecordStore`] - Store over a backend chosen at runtime
//!
//! # Example
//!
//! ```ignore
//! use reclayer::store::RecordStore;
//!
//! let store = RecordStore::new(backend);
//! let todos = store.collection::<Todo>();
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::CollectionStore,
    error::CollectionStoreResult,
    record::Record,
};

/// A record store bound to a specific backend implementation.
///
/// The store owns its backend. Backend connections are shared by every
/// collection handle obtained from the same store and are never exposed directly.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct RecordStore<B: StoreBackend> {
    backend: B,
}

/// A record store whose backend type was erased with [`RecordStore::into_dyn`].
pub type DynRecordStore = RecordStore<Box<dyn DynStoreBackend>>;

impl<B: StoreBackend> RecordStore<B> {
    /// Creates a new record store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Gets the collection for record type `R`, named by `R::collection_name()`.
    pub fn collection<R: Record>(&self) -> CollectionStore<'_, B, R> {
        CollectionStore::new(R::collection_name().to_string(), &self.backend)
    }

    /// Gets a collection of `R` records stored under an explicit name.
    pub fn collection_named<R: Record>(&self, name: &str) -> CollectionStore<'_, B, R> {
        CollectionStore::new(name.to_string(), &self.backend)
    }

    /// Returns a reference to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> CollectionStoreResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: StoreBackend + 'static> RecordStore<B> {
    /// Erases the backend type so the store can be chosen at runtime.
    pub fn into_dyn(self) -> DynRecordStore {
        RecordStore::new(Box::new(self.backend) as Box<dyn DynStoreBackend>)
    }
}

impl DynRecordStore {
    /// Attempts to borrow the erased backend as a concrete type.
    pub fn downcast_backend<B: StoreBackend + 'static>(&self) -> Option<&B> {
        DynStoreBackend::as_any(&*self.backend).downcast_ref::<B>()
    }
}

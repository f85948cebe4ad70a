//! In-memory storage implementation for record collections.
//!
//! Records are held as BSON values in ordered maps behind a single async-aware
//! read-write lock. Nothing survives a process restart.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use async_trait::async_trait;
use bson::Bson;
use mea::rwlock::RwLock;
use tracing::{debug, info};

use reclayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::CollectionStoreResult,
    record::RecordId,
};

/// State of one collection: its records and the last id handed out by `next_key`.
#[derive(Default, Debug)]
struct CollectionState {
    records: BTreeMap<RecordId, Bson>,
    last_key: RecordId,
}

type StoreMap = HashMap<String, CollectionState>;

/// Thread-safe, volatile record storage backend.
///
/// `InMemoryStore` is cloneable; clones share the same underlying data. All
/// mutation, including key allocation, happens under one write lock, so
/// concurrent [`next_key`](StoreBackend::next_key) callers can never observe
/// the same counter value.
///
/// Operations resolve without suspending on I/O but are exposed through the same
/// async interface as persistent backends.
///
/// # Example
///
/// ```ignore
/// use reclayer_memory::InMemoryStore;
/// use reclayer::backend::StoreBackend;
/// use bson::{Bson, doc};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     let id = store.next_key("todos").await?;
///     let todo = Bson::Document(doc! { "id": id, "title": "buy milk" });
///     store.put_record("todos", id, todo).await?;
///
///     assert!(store.get_record("todos", id).await?.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> collection state
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn get_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<Option<Bson>> {
        Ok(
            self.store
                .read()
                .await
                .get(collection)
                .and_then(|state| state.records.get(&id))
                .cloned()
        )
    }

    async fn put_record(&self, collection: &str, id: RecordId, record: Bson) -> CollectionStoreResult<Bson> {
        debug!(collection, id, "put record");

        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .records
            .insert(id, record.clone());

        Ok(record)
    }

    async fn delete_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<()> {
        debug!(collection, id, "delete record");

        if let Some(state) = self.store.write().await.get_mut(collection) {
            state.records.remove(&id);
        }

        Ok(())
    }

    async fn delete_all_records(&self, collection: &str) -> CollectionStoreResult<()> {
        debug!(collection, "delete all records");

        // The key counter is kept so cleared ids are never reissued.
        if let Some(state) = self.store.write().await.get_mut(collection) {
            state.records.clear();
        }

        Ok(())
    }

    async fn get_all_records(&self, collection: &str) -> CollectionStoreResult<Vec<(RecordId, Bson)>> {
        Ok(
            self.store
                .read()
                .await
                .get(collection)
                .map(|state| {
                    state
                        .records
                        .iter()
                        .map(|(id, doc)| (*id, doc.clone()))
                        .collect()
                })
                .unwrap_or_default()
        )
    }

    async fn next_key(&self, collection: &str) -> CollectionStoreResult<RecordId> {
        let mut store = self.store.write().await;
        let state = store.entry(collection.to_string()).or_default();

        // Skip ids a client already claimed through a direct upsert.
        loop {
            state.last_key += 1;

            if !state.records.contains_key(&state.last_key) {
                debug!(collection, id = state.last_key, "allocated key");
                return Ok(state.last_key);
            }
        }
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use reclayer_memory::InMemoryStore;
/// use reclayer::backend::StoreBackendBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder().build().await.unwrap();
/// }
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds a fresh, empty [`InMemoryStore`]. Always succeeds.
    async fn build(self) -> CollectionStoreResult<Self::Backend> {
        info!("created in-memory record store");

        Ok(InMemoryStore::new())
    }
}

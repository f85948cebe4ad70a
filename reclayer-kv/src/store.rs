//! Persistent record storage on top of a [`KeyValueClient`].
//!
//! Each collection occupies three kinds of keys:
//!
//! | key                          | holds                                  |
//! |------------------------------|----------------------------------------|
//! | `[ns:]collection:<id>`       | the record, as BSON document bytes     |
//! | `[ns:]collection:__nextid__` | the id counter                         |
//! | `[ns:]collection:__index__`  | the set of live ids                    |
//!
//! The index set is maintained alongside every write and delete so that
//! enumeration and bulk deletion never have to scan the keyspace.

use async_trait::async_trait;
use bson::Bson;
use futures::future::try_join_all;
use tracing::{debug, info};

use reclayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{CollectionStoreError, CollectionStoreResult},
    record::RecordId,
};

use crate::{client::KeyValueClient, codec};

const COUNTER_SUFFIX: &str = "__nextid__";
const INDEX_SUFFIX: &str = "__index__";

/// Record storage backend persisting collections in a key-value server.
///
/// Ids come from the server's atomic increment, so allocation stays race-free
/// across any number of processes sharing the server. The counter is never
/// reset, not even by [`delete_all_records`](StoreBackend::delete_all_records),
/// which keeps ids from being reissued across restarts.
///
/// # Consistency
///
/// A record key and its index entry are written through the client's grouped
/// [`put_indexed`](KeyValueClient::put_indexed), [`delete_indexed`](KeyValueClient::delete_indexed)
/// and [`delete_all_indexed`](KeyValueClient::delete_all_indexed) commands. Clients that
/// cannot apply a pair atomically may leave a stale index entry behind; reads skip index
/// entries whose record key is gone, and deletes are idempotent per key.
#[derive(Debug)]
pub struct KeyValueStore<C: KeyValueClient> {
    client: C,
    namespace: Option<String>,
}

impl<C: KeyValueClient> KeyValueStore<C> {
    /// Creates a store over `client` with no key namespace.
    pub fn new(client: C) -> Self {
        Self { client, namespace: None }
    }

    /// Starts a [`KeyValueStoreBuilder`] over `client`.
    pub fn builder(client: C) -> KeyValueStoreBuilder<C> {
        KeyValueStoreBuilder::new(client)
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The prefix applied to every key, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn key(&self, collection: &str, suffix: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}:{collection}:{suffix}"),
            None => format!("{collection}:{suffix}"),
        }
    }

    /// Key holding the record `id` of `collection`.
    pub fn record_key(&self, collection: &str, id: RecordId) -> String {
        self.key(collection, &id.to_string())
    }

    /// Key holding the id counter of `collection`.
    pub fn counter_key(&self, collection: &str) -> String {
        self.key(collection, COUNTER_SUFFIX)
    }

    /// Key holding the set of live ids of `collection`.
    pub fn index_key(&self, collection: &str) -> String {
        self.key(collection, INDEX_SUFFIX)
    }

    async fn live_ids(&self, collection: &str) -> CollectionStoreResult<Vec<RecordId>> {
        let mut ids = self
            .client
            .set_members(&self.index_key(collection))
            .await?
            .into_iter()
            .map(|member| {
                member.parse::<RecordId>().map_err(|err| {
                    CollectionStoreError::corrupt_key(collection, member.clone(), format!("bad index entry: {err}"))
                })
            })
            .collect::<CollectionStoreResult<Vec<_>>>()?;

        ids.sort_unstable();

        Ok(ids)
    }
}

#[async_trait]
impl<C: KeyValueClient> StoreBackend for KeyValueStore<C> {
    async fn get_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<Option<Bson>> {
        self.client
            .get(&self.record_key(collection, id))
            .await?
            .map(|bytes| codec::decode(collection, id, &bytes))
            .transpose()
    }

    async fn put_record(&self, collection: &str, id: RecordId, record: Bson) -> CollectionStoreResult<Bson> {
        debug!(collection, id, "put record");

        self.client
            .put_indexed(
                &self.record_key(collection, id),
                codec::encode(&record)?,
                &self.index_key(collection),
                &id.to_string(),
            )
            .await?;

        Ok(record)
    }

    async fn delete_record(&self, collection: &str, id: RecordId) -> CollectionStoreResult<()> {
        debug!(collection, id, "delete record");

        self.client
            .delete_indexed(
                &self.record_key(collection, id),
                &self.index_key(collection),
                &id.to_string(),
            )
            .await
    }

    async fn delete_all_records(&self, collection: &str) -> CollectionStoreResult<()> {
        let members = self.client.set_members(&self.index_key(collection)).await?;

        // Malformed members are dropped from the index but never turned into keys, so
        // they cannot reach the counter or the index itself.
        let keys = members
            .iter()
            .filter_map(|member| member.parse::<RecordId>().ok())
            .map(|id| self.record_key(collection, id))
            .collect::<Vec<_>>();

        debug!(collection, count = keys.len(), "delete all records");

        // Only the members read above are cleared; records upserted meanwhile keep
        // their index entry.
        self.client
            .delete_all_indexed(keys, &self.index_key(collection), members)
            .await
    }

    async fn get_all_records(&self, collection: &str) -> CollectionStoreResult<Vec<(RecordId, Bson)>> {
        let ids = self.live_ids(collection).await?;

        let records = try_join_all(ids.into_iter().map(|id| async move {
            self.get_record(collection, id)
                .await
                .map(|record| record.map(|doc| (id, doc)))
        }))
        .await?;

        // Index entries whose record key has vanished are stale, not live.
        Ok(records.into_iter().flatten().collect())
    }

    async fn next_key(&self, collection: &str) -> CollectionStoreResult<RecordId> {
        let counter = self.counter_key(collection);
        let index = self.index_key(collection);

        // Skip ids a client already claimed through a direct upsert.
        loop {
            let id = self.client.increment(&counter).await?;

            if !self.client.set_contains(&index, &id.to_string()).await? {
                debug!(collection, id, "allocated key");
                return Ok(id);
            }
        }
    }

    async fn shutdown(self) -> CollectionStoreResult<()> {
        self.client.shutdown().await
    }
}

/// Builder for [`KeyValueStore`].
///
/// # Example
///
/// ```ignore
/// use reclayer_kv::{KeyValueStore, MemoryKeyValueClient};
/// use reclayer::backend::StoreBackendBuilder;
///
/// let store = KeyValueStore::builder(MemoryKeyValueClient::new())
///     .namespace("todo-app")
///     .build()
///     .await?;
/// ```
#[derive(Debug)]
pub struct KeyValueStoreBuilder<C: KeyValueClient> {
    client: C,
    namespace: Option<String>,
}

impl<C: KeyValueClient> KeyValueStoreBuilder<C> {
    /// Creates a builder over `client` with no key namespace.
    pub fn new(client: C) -> Self {
        Self { client, namespace: None }
    }

    /// Prefixes every key written by the store with `namespace:`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

#[async_trait]
impl<C: KeyValueClient> StoreBackendBuilder for KeyValueStoreBuilder<C> {
    type Backend = KeyValueStore<C>;

    async fn build(self) -> CollectionStoreResult<Self::Backend> {
        info!(namespace = ?self.namespace, "created key-value record store");

        Ok(KeyValueStore {
            client: self.client,
            namespace: self.namespace,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
    };

    use bson::doc;
    use reclayer_core::{record::Record, store::RecordStore};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::memory::MemoryKeyValueClient;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: RecordId,
        name: String,
    }

    impl Record for Item {
        fn id(&self) -> RecordId {
            self.id
        }

        fn collection_name() -> &'static str {
            "items"
        }
    }

    fn item(id: RecordId, name: &str) -> Item {
        Item { id, name: name.to_string() }
    }

    fn store() -> (MemoryKeyValueClient, KeyValueStore<MemoryKeyValueClient>) {
        let client = MemoryKeyValueClient::new();

        (client.clone(), KeyValueStore::new(client))
    }

    /// Client that upserts record 7 of `items` right after the index is first read,
    /// landing a concurrent write between a clear's read and its removal.
    #[derive(Debug, Clone)]
    struct UpsertAfterIndexRead {
        inner: MemoryKeyValueClient,
        fired: Arc<AtomicBool>,
        grouped: bool,
    }

    impl UpsertAfterIndexRead {
        fn new(grouped: bool) -> Self {
            Self {
                inner: MemoryKeyValueClient::new(),
                fired: Arc::new(AtomicBool::new(false)),
                grouped,
            }
        }
    }

    #[async_trait]
    impl KeyValueClient for UpsertAfterIndexRead {
        async fn get(&self, key: &str) -> CollectionStoreResult<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>) -> CollectionStoreResult<()> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> CollectionStoreResult<()> {
            self.inner.delete(key).await
        }

        async fn increment(&self, key: &str) -> CollectionStoreResult<i64> {
            self.inner.increment(key).await
        }

        async fn set_add(&self, key: &str, member: &str) -> CollectionStoreResult<()> {
            self.inner.set_add(key, member).await
        }

        async fn set_remove(&self, key: &str, member: &str) -> CollectionStoreResult<()> {
            self.inner.set_remove(key, member).await
        }

        async fn set_members(&self, key: &str) -> CollectionStoreResult<Vec<String>> {
            let members = self.inner.set_members(key).await?;

            if !self.fired.swap(true, Ordering::SeqCst) {
                let bytes = codec::encode(&Bson::Document(doc! { "id": 7_i64 }))?;
                self.inner.put_indexed("items:7", bytes, "items:__index__", "7").await?;
            }

            Ok(members)
        }

        async fn set_contains(&self, key: &str, member: &str) -> CollectionStoreResult<bool> {
            self.inner.set_contains(key, member).await
        }

        async fn put_indexed(
            &self,
            key: &str,
            value: Vec<u8>,
            index: &str,
            member: &str,
        ) -> CollectionStoreResult<()> {
            self.inner.put_indexed(key, value, index, member).await
        }

        async fn delete_all_indexed(
            &self,
            keys: Vec<String>,
            index: &str,
            members: Vec<String>,
        ) -> CollectionStoreResult<()> {
            if self.grouped {
                return self.inner.delete_all_indexed(keys, index, members).await;
            }

            // Same steps as the trait's two-step default.
            for member in &members {
                self.inner.set_remove(index, member).await?;
            }
            self.inner.delete_many(keys).await
        }
    }

    #[test]
    fn test_key_layout() {
        let plain = KeyValueStore::new(MemoryKeyValueClient::new());
        assert_eq!(plain.record_key("todos", 5), "todos:5");
        assert_eq!(plain.counter_key("todos"), "todos:__nextid__");
        assert_eq!(plain.index_key("todos"), "todos:__index__");

        let scoped = KeyValueStore {
            client: MemoryKeyValueClient::new(),
            namespace: Some("app".to_string()),
        };
        assert_eq!(scoped.record_key("todos", 5), "app:todos:5");
        assert_eq!(scoped.namespace(), Some("app"));
    }

    #[tokio::test]
    async fn test_put_writes_record_and_index() {
        let (client, store) = store();

        store
            .put_record("items", 4, Bson::Document(doc! { "id": 4_i64, "name": "four" }))
            .await
            .unwrap();

        assert!(client.get("items:4").await.unwrap().is_some());
        assert_eq!(client.set_members("items:__index__").await.unwrap(), vec!["4".to_string()]);
    }

    #[tokio::test]
    async fn test_second_identical_upsert_changes_nothing() {
        let (client, store) = store();
        let records = RecordStore::new(store);
        let items = records.collection::<Item>();

        let stored = items.update(1, item(1, "same")).await.unwrap();
        let bytes = client.get("items:1").await.unwrap();
        let keys = client.len().await;

        items.update(1, stored.clone()).await.unwrap();

        assert_eq!(client.get("items:1").await.unwrap(), bytes);
        assert_eq!(client.len().await, keys);
        assert_eq!(client.set_members("items:__index__").await.unwrap(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_index_entry() {
        let (client, store) = store();

        store
            .put_record("items", 2, Bson::Document(doc! { "id": 2_i64 }))
            .await
            .unwrap();
        store.delete_record("items", 2).await.unwrap();
        store.delete_record("items", 2).await.unwrap();

        assert!(client.get("items:2").await.unwrap().is_none());
        assert!(!client.set_contains("items:__index__", "2").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_all_keeps_counter() {
        let (client, store) = store();

        for _ in 0..3 {
            let id = store.next_key("items").await.unwrap();
            store
                .put_record("items", id, Bson::Document(doc! { "id": id }))
                .await
                .unwrap();
        }

        store.delete_all_records("items").await.unwrap();

        assert!(store.get_all_records("items").await.unwrap().is_empty());
        // Only the counter survives.
        assert_eq!(client.len().await, 1);
        assert_eq!(store.next_key("items").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_delete_all_tolerates_stale_index() {
        let (client, store) = store();

        client.set_add("items:__index__", "8").await.unwrap();
        client.set_add("items:__index__", "junk").await.unwrap();

        store.delete_all_records("items").await.unwrap();
        assert!(client.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_all_spares_records_upserted_meanwhile() {
        for grouped in [true, false] {
            let store = KeyValueStore::new(UpsertAfterIndexRead::new(grouped));

            for _ in 0..3 {
                let id = store.next_key("items").await.unwrap();
                store
                    .put_record("items", id, Bson::Document(doc! { "id": id }))
                    .await
                    .unwrap();
            }

            store.delete_all_records("items").await.unwrap();

            // The record written during the clear stays both readable and listed.
            assert!(store.get_record("items", 7).await.unwrap().is_some());
            let ids = store
                .get_all_records("items")
                .await
                .unwrap()
                .into_iter()
                .map(|(id, _)| id)
                .collect::<Vec<_>>();
            assert_eq!(ids, vec![7]);

            for _ in 0..10 {
                assert_ne!(store.next_key("items").await.unwrap(), 7);
            }
        }
    }

    #[tokio::test]
    async fn test_delete_all_never_touches_reserved_keys() {
        let (client, store) = store();

        assert_eq!(store.next_key("items").await.unwrap(), 1);
        client.set_add("items:__index__", "__nextid__").await.unwrap();
        client.set_add("items:__index__", "__index__").await.unwrap();

        store.delete_all_records("items").await.unwrap();

        assert!(client.set_members("items:__index__").await.unwrap().is_empty());
        assert_eq!(store.next_key("items").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_all_skips_stale_index_entries() {
        let (client, store) = store();

        store
            .put_record("items", 1, Bson::Document(doc! { "id": 1_i64 }))
            .await
            .unwrap();
        client.set_add("items:__index__", "2").await.unwrap();

        let all = store.get_all_records("items").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, 1);
    }

    #[tokio::test]
    async fn test_corrupt_bytes_are_reported() {
        let (client, store) = store();
        let records = RecordStore::new(store);
        let items = records.collection::<Item>();

        items.update(1, item(1, "fine")).await.unwrap();
        client.set("items:2", b"garbage".to_vec()).await.unwrap();
        client.set_add("items:__index__", "2").await.unwrap();

        assert!(items.get(1).await.unwrap().is_some());
        assert!(items.get(2).await.unwrap_err().is_corrupt());
        assert!(items.get_all().await.unwrap_err().is_corrupt());
        // Unreadable bytes fail even the lenient read; only shape mismatches are skipped.
        assert!(items.get_all_lenient().await.unwrap_err().is_corrupt());
    }

    #[tokio::test]
    async fn test_lenient_read_skips_mismatched_shapes() {
        let (client, store) = store();
        let records = RecordStore::new(store);
        let items = records.collection::<Item>();

        items.update(1, item(1, "fine")).await.unwrap();
        let bytes = codec::encode(&Bson::Document(doc! { "id": 2_i64, "name": 5_i32 })).unwrap();
        client.put_indexed("items:2", bytes, "items:__index__", "2").await.unwrap();

        assert!(items.get_all().await.unwrap_err().is_corrupt());
        assert_eq!(items.get_all_lenient().await.unwrap(), vec![item(1, "fine")]);
    }

    #[tokio::test]
    async fn test_wrong_shape_is_corrupt() {
        let (client, store) = store();
        let records = RecordStore::new(store);
        let items = records.collection::<Item>();

        let bytes = codec::encode(&Bson::Document(doc! { "id": "three" })).unwrap();
        client.put_indexed("items:3", bytes, "items:__index__", "3").await.unwrap();

        let err = items.get(3).await.unwrap_err();
        assert!(matches!(err, CollectionStoreError::CorruptRecord { ref id, .. } if id == "3"));
    }

    #[tokio::test]
    async fn test_bad_index_member_is_corrupt() {
        let (client, store) = store();

        client.set_add("items:__index__", "seven").await.unwrap();

        assert!(store.get_all_records("items").await.unwrap_err().is_corrupt());
    }

    #[tokio::test]
    async fn test_outage_is_backend_unavailable() {
        let (client, store) = store();
        client.disconnect();

        assert!(store.get_record("items", 1).await.unwrap_err().is_unavailable());
        assert!(store.next_key("items").await.unwrap_err().is_unavailable());
        assert!(store.delete_all_records("items").await.unwrap_err().is_unavailable());
    }

    #[tokio::test]
    async fn test_next_key_skips_client_chosen_ids() {
        let (_, store) = store();

        store
            .put_record("items", 1, Bson::Document(doc! { "id": 1_i64 }))
            .await
            .unwrap();

        assert_eq!(store.next_key("items").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_counter_is_shared_between_stores() {
        let client = MemoryKeyValueClient::new();
        let first = KeyValueStore::new(client.clone());
        let second = KeyValueStore::new(client);

        assert_eq!(first.next_key("items").await.unwrap(), 1);
        assert_eq!(second.next_key("items").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_builder_applies_namespace() {
        let client = MemoryKeyValueClient::new();
        let store = KeyValueStore::builder(client.clone())
            .namespace("app")
            .build()
            .await
            .unwrap();

        store.next_key("items").await.unwrap();
        assert!(client.get("app:items:__nextid__").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_next_key_is_unique() {
        let client = MemoryKeyValueClient::new();

        let handles = (0..100)
            .map(|_| {
                let store = KeyValueStore::new(client.clone());
                tokio::spawn(async move { store.next_key("items").await })
            })
            .collect::<Vec<_>>();

        let ids = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect::<HashSet<_>>();

        assert_eq!(ids.len(), 100);
    }
}

use std::{collections::HashSet, sync::Arc};

use reclayer::{
    kv::{KeyValueStore, MemoryKeyValueClient},
    memory::InMemoryStore,
    prelude::*,
    todo::Todo,
};

async fn empty_collection_scenario<B: StoreBackend>(store: RecordStore<B>) {
    let todos = store.collection::<Todo>();

    let id = todos.next_key().await.unwrap();
    assert_eq!(id, 1);

    todos.update(1, Todo::new(1, "buy milk")).await.unwrap();

    assert_eq!(todos.get_all().await.unwrap(), vec![Todo::new(1, "buy milk")]);
}

async fn upsert_unallocated_id<B: StoreBackend>(store: RecordStore<B>) {
    let todos = store.collection::<Todo>();

    let stored = todos.update(5, Todo::new(5, "direct")).await.unwrap();

    assert_eq!(stored, Todo::new(5, "direct"));
    assert_eq!(todos.get(5).await.unwrap(), Some(stored));
    assert_eq!(todos.get_all().await.unwrap().len(), 1);
}

async fn get_reflects_latest_write<B: StoreBackend>(store: RecordStore<B>) {
    let todos = store.collection::<Todo>();
    let id = todos.next_key().await.unwrap();

    let first = Todo::new(id, "draft").with_order(3);
    todos.update(id, first.clone()).await.unwrap();
    assert_eq!(todos.get(id).await.unwrap(), Some(first));

    let second = Todo::new(id, "final").with_completed(true).with_order(-1);
    todos.update(id, second.clone()).await.unwrap();
    assert_eq!(todos.get(id).await.unwrap(), Some(second));
}

async fn missing_is_absence<B: StoreBackend>(store: RecordStore<B>) {
    let todos = store.collection::<Todo>();

    assert_eq!(todos.get(1).await.unwrap(), None);
    assert_eq!(todos.get(-7).await.unwrap(), None);
    assert!(todos.get_all().await.unwrap().is_empty());
}

async fn delete_then_get_is_absence<B: StoreBackend>(store: RecordStore<B>) {
    let todos = store.collection::<Todo>();
    todos.update(1, Todo::new(1, "doomed")).await.unwrap();

    todos.delete(1).await.unwrap();
    assert_eq!(todos.get(1).await.unwrap(), None);

    // Deleting something that never existed is not an error either.
    todos.delete(99).await.unwrap();
    assert_eq!(todos.get(99).await.unwrap(), None);
}

async fn delete_all_empties_collection<B: StoreBackend>(store: RecordStore<B>) {
    let todos = store.collection::<Todo>();

    todos.delete_all().await.unwrap();
    assert!(todos.get_all().await.unwrap().is_empty());

    for title in ["a", "b", "c"] {
        todos.create(|id| Todo::new(id, title)).await.unwrap();
    }
    todos.update(40, Todo::new(40, "d")).await.unwrap();

    todos.delete_all().await.unwrap();
    assert!(todos.get_all().await.unwrap().is_empty());

    // Cleared ids are not handed out again.
    assert_eq!(todos.next_key().await.unwrap(), 4);
}

async fn repeated_upsert_is_idempotent<B: StoreBackend>(store: RecordStore<B>) {
    let todos = store.collection::<Todo>();
    let id = todos.next_key().await.unwrap();

    todos.update(id, Todo::new(id, "same")).await.unwrap();
    let read = todos.get(id).await.unwrap().unwrap();
    let again = todos.update(id, read.clone()).await.unwrap();

    assert_eq!(again, read);
    assert_eq!(todos.get_all().await.unwrap(), vec![read]);
}

async fn mismatched_id_is_invalid<B: StoreBackend>(store: RecordStore<B>) {
    let todos = store.collection::<Todo>();

    let err = todos.update(1, Todo::new(2, "wrong")).await.unwrap_err();

    assert!(matches!(err, CollectionStoreError::InvalidArgument(_)));
    assert!(todos.get_all().await.unwrap().is_empty());
}

async fn patch_flow<B: StoreBackend>(store: RecordStore<B>) {
    let todos = store.collection::<Todo>();
    let created = todos.create(|id| Todo::new(id, "walk dog")).await.unwrap();

    let mut fetched = todos.get(created.id).await.unwrap().unwrap();
    fetched.completed = true;

    // The caller's copy is detached until written back.
    assert!(!todos.get(created.id).await.unwrap().unwrap().completed);

    let patched = todos.update(created.id, fetched).await.unwrap();
    assert!(patched.completed);
    assert_eq!(patched.title, "walk dog");
    assert_eq!(todos.get(created.id).await.unwrap(), Some(patched));
}

async fn collections_are_isolated<B: StoreBackend>(store: RecordStore<B>) {
    let todos = store.collection::<Todo>();
    let archive = store.collection_named::<Todo>("archived-todos");

    todos.update(1, Todo::new(1, "live")).await.unwrap();
    archive.update(1, Todo::new(1, "old")).await.unwrap();

    archive.delete_all().await.unwrap();

    assert_eq!(todos.get(1).await.unwrap(), Some(Todo::new(1, "live")));
    assert_eq!(archive.name(), "archived-todos");
    // Id 1 was chosen by the client, never issued, and is free again.
    assert_eq!(archive.next_key().await.unwrap(), 1);
    assert_eq!(todos.next_key().await.unwrap(), 2);
}

async fn concurrent_next_key_is_unique<B: StoreBackend + 'static>(store: RecordStore<B>) {
    let store = Arc::new(store);

    let handles = (0..100)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.collection::<Todo>().next_key().await })
        })
        .collect::<Vec<_>>();

    let ids = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect::<HashSet<_>>();

    assert_eq!(ids.len(), 100);
    assert!(ids.iter().all(|id| (1..=100).contains(id)));
}

macro_rules! backend_tests {
    ($name:ident, $store:expr) => {
        mod $name {
            use super::*;

            #[tokio::test]
            async fn empty_collection_scenario() {
                super::empty_collection_scenario($store).await;
            }

            #[tokio::test]
            async fn upsert_unallocated_id() {
                super::upsert_unallocated_id($store).await;
            }

            #[tokio::test]
            async fn get_reflects_latest_write() {
                super::get_reflects_latest_write($store).await;
            }

            #[tokio::test]
            async fn missing_is_absence() {
                super::missing_is_absence($store).await;
            }

            #[tokio::test]
            async fn delete_then_get_is_absence() {
                super::delete_then_get_is_absence($store).await;
            }

            #[tokio::test]
            async fn delete_all_empties_collection() {
                super::delete_all_empties_collection($store).await;
            }

            #[tokio::test]
            async fn repeated_upsert_is_idempotent() {
                super::repeated_upsert_is_idempotent($store).await;
            }

            #[tokio::test]
            async fn mismatched_id_is_invalid() {
                super::mismatched_id_is_invalid($store).await;
            }

            #[tokio::test]
            async fn patch_flow() {
                super::patch_flow($store).await;
            }

            #[tokio::test]
            async fn collections_are_isolated() {
                super::collections_are_isolated($store).await;
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn concurrent_next_key_is_unique() {
                super::concurrent_next_key_is_unique($store).await;
            }
        }
    };
}

backend_tests!(in_memory, RecordStore::new(InMemoryStore::new()));
backend_tests!(key_value, RecordStore::new(KeyValueStore::new(MemoryKeyValueClient::new())));
backend_tests!(dyn_in_memory, RecordStore::new(InMemoryStore::new()).into_dyn());
backend_tests!(
    dyn_key_value,
    RecordStore::new(KeyValueStore::new(MemoryKeyValueClient::new())).into_dyn()
);

#[tokio::test]
async fn shutdown_releases_store() {
    let store = RecordStore::new(KeyValueStore::new(MemoryKeyValueClient::new())).into_dyn();
    store.collection::<Todo>().update(1, Todo::new(1, "bye")).await.unwrap();

    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn outage_surfaces_as_backend_unavailable() {
    let client = MemoryKeyValueClient::new();
    let store = RecordStore::new(KeyValueStore::new(client.clone()));
    let todos = store.collection::<Todo>();

    todos.update(1, Todo::new(1, "before")).await.unwrap();
    client.disconnect();

    assert!(todos.get(1).await.unwrap_err().is_unavailable());
    assert!(todos.update(1, Todo::new(1, "during")).await.unwrap_err().is_unavailable());

    client.reconnect();
    assert_eq!(todos.get(1).await.unwrap(), Some(Todo::new(1, "before")));
}

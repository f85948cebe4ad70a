//! An in-process [`KeyValueClient`].
//!
//! Follows the semantics of a Redis server closely enough to run a
//! [`KeyValueStore`](crate::store::KeyValueStore) without one: counters are stored as
//! decimal strings, sets and plain values share one keyspace, and using a key as the
//! wrong kind is an error.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use async_trait::async_trait;
use mea::rwlock::RwLock;

use reclayer_core::error::{CollectionStoreError, CollectionStoreResult};

use crate::client::KeyValueClient;

#[derive(Debug, Clone)]
enum Entry {
    Value(Vec<u8>),
    Set(BTreeSet<String>),
}

fn wrong_type(key: &str) -> CollectionStoreError {
    CollectionStoreError::Backend(format!(
        "WRONGTYPE operation against key {key} holding the wrong kind of value"
    ))
}

/// Removes `members` from the set at `index`, dropping the set once it is empty.
fn remove_members<'a>(
    entries: &mut HashMap<String, Entry>,
    index: &str,
    members: impl IntoIterator<Item = &'a str>,
) {
    if let Some(Entry::Set(set)) = entries.get_mut(index) {
        for member in members {
            set.remove(member);
        }

        if set.is_empty() {
            entries.remove(index);
        }
    }
}

/// Shared, in-process key-value client.
///
/// Clones share the same keyspace, which makes it possible to tamper with stored
/// bytes or simulate an outage from a test while a store holds another clone.
#[derive(Debug, Clone)]
pub struct MemoryKeyValueClient {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    connected: Arc<AtomicBool>,
}

impl Default for MemoryKeyValueClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKeyValueClient {
    /// Creates a connected client over an empty keyspace.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Makes every subsequent command fail with `BackendUnavailable` until [`reconnect`](Self::reconnect).
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Ends a simulated outage started by [`disconnect`](Self::disconnect).
    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Number of keys currently held, across values and sets.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if no keys are held.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_connected(&self) -> CollectionStoreResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CollectionStoreError::BackendUnavailable(
                "in-memory key-value client is disconnected".to_string(),
            ))
        }
    }
}

#[async_trait]
impl KeyValueClient for MemoryKeyValueClient {
    async fn get(&self, key: &str) -> CollectionStoreResult<Option<Vec<u8>>> {
        self.ensure_connected()?;

        match self.entries.read().await.get(key) {
            None => Ok(None),
            Some(Entry::Value(bytes)) => Ok(Some(bytes.clone())),
            Some(Entry::Set(_)) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> CollectionStoreResult<()> {
        self.ensure_connected()?;

        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry::Value(value));

        Ok(())
    }

    async fn delete(&self, key: &str) -> CollectionStoreResult<()> {
        self.ensure_connected()?;

        self.entries.write().await.remove(key);

        Ok(())
    }

    async fn delete_many(&self, keys: Vec<String>) -> CollectionStoreResult<()> {
        self.ensure_connected()?;

        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(&key);
        }

        Ok(())
    }

    async fn increment(&self, key: &str) -> CollectionStoreResult<i64> {
        self.ensure_connected()?;

        let mut entries = self.entries.write().await;
        let current = match entries.get(key) {
            None => 0,
            Some(Entry::Value(bytes)) => std::str::from_utf8(bytes)
                .ok()
                .and_then(|text| text.parse::<i64>().ok())
                .ok_or_else(|| {
                    CollectionStoreError::Backend(format!(
                        "value at {key} is not an integer or out of range"
                    ))
                })?,
            Some(Entry::Set(_)) => return Err(wrong_type(key)),
        };

        let next = current.checked_add(1).ok_or_else(|| {
            CollectionStoreError::Backend(format!("increment of {key} would overflow"))
        })?;
        entries.insert(key.to_string(), Entry::Value(next.to_string().into_bytes()));

        Ok(next)
    }

    async fn set_add(&self, key: &str, member: &str) -> CollectionStoreResult<()> {
        self.ensure_connected()?;

        let mut entries = self.entries.write().await;
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()))
        {
            Entry::Set(members) => {
                members.insert(member.to_string());
                Ok(())
            }
            Entry::Value(_) => Err(wrong_type(key)),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> CollectionStoreResult<()> {
        self.ensure_connected()?;

        let mut entries = self.entries.write().await;
        if matches!(entries.get(key), Some(Entry::Value(_))) {
            return Err(wrong_type(key));
        }

        // Like Redis, an emptied set ceases to exist.
        remove_members(&mut entries, key, [member]);

        Ok(())
    }

    async fn set_members(&self, key: &str) -> CollectionStoreResult<Vec<String>> {
        self.ensure_connected()?;

        match self.entries.read().await.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(Entry::Value(_)) => Err(wrong_type(key)),
        }
    }

    async fn set_contains(&self, key: &str, member: &str) -> CollectionStoreResult<bool> {
        self.ensure_connected()?;

        match self.entries.read().await.get(key) {
            None => Ok(false),
            Some(Entry::Set(members)) => Ok(members.contains(member)),
            Some(Entry::Value(_)) => Err(wrong_type(key)),
        }
    }

    async fn put_indexed(
        &self,
        key: &str,
        value: Vec<u8>,
        index: &str,
        member: &str,
    ) -> CollectionStoreResult<()> {
        self.ensure_connected()?;

        // One lock acquisition applies both writes or neither.
        let mut entries = self.entries.write().await;
        if matches!(entries.get(index), Some(Entry::Value(_))) {
            return Err(wrong_type(index));
        }

        entries.insert(key.to_string(), Entry::Value(value));
        if let Entry::Set(members) = entries
            .entry(index.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()))
        {
            members.insert(member.to_string());
        }

        Ok(())
    }

    async fn delete_indexed(&self, key: &str, index: &str, member: &str) -> CollectionStoreResult<()> {
        self.ensure_connected()?;

        let mut entries = self.entries.write().await;
        if matches!(entries.get(index), Some(Entry::Value(_))) {
            return Err(wrong_type(index));
        }

        entries.remove(key);
        remove_members(&mut entries, index, [member]);

        Ok(())
    }

    async fn delete_all_indexed(
        &self,
        keys: Vec<String>,
        index: &str,
        members: Vec<String>,
    ) -> CollectionStoreResult<()> {
        self.ensure_connected()?;

        let mut entries = self.entries.write().await;
        if matches!(entries.get(index), Some(Entry::Value(_))) {
            return Err(wrong_type(index));
        }

        for key in &keys {
            entries.remove(key);
        }
        remove_members(&mut entries, index, members.iter().map(String::as_str));

        Ok(())
    }
}

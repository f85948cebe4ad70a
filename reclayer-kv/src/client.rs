//! The key-value primitives a [`KeyValueStore`](crate::store::KeyValueStore) is built on.

use async_trait::async_trait;
use std::fmt::Debug;

use reclayer_core::error::CollectionStoreResult;

/// Client for a key-value server offering plain values, integer counters and string sets.
///
/// The command set mirrors what Redis-like servers provide natively. Clients are
/// expected to share one connection (or pool) process-wide and to surface
/// connectivity problems as
/// [`BackendUnavailable`](reclayer_core::error::CollectionStoreError::BackendUnavailable).
/// Clients never retry on their own behalf.
#[async_trait]
pub trait KeyValueClient: Send + Sync + Debug {
    /// Reads the value stored at `key`.
    async fn get(&self, key: &str) -> CollectionStoreResult<Option<Vec<u8>>>;

    /// Stores `value` at `key`, replacing whatever was there.
    async fn set(&self, key: &str, value: Vec<u8>) -> CollectionStoreResult<()>;

    /// Removes `key`. A missing key is not an error.
    async fn delete(&self, key: &str) -> CollectionStoreResult<()>;

    /// Removes every key in `keys`, ignoring the ones that do not exist.
    async fn delete_many(&self, keys: Vec<String>) -> CollectionStoreResult<()> {
        for key in keys {
            self.delete(&key).await?;
        }

        Ok(())
    }

    /// Atomically increments the integer counter at `key` and returns the new value.
    ///
    /// A missing counter starts from zero, so the first call returns `1`.
    async fn increment(&self, key: &str) -> CollectionStoreResult<i64>;

    /// Adds `member` to the set at `key`. Adding an existing member is a no-op.
    async fn set_add(&self, key: &str, member: &str) -> CollectionStoreResult<()>;

    /// Removes `member` from the set at `key`. Removing a missing member is a no-op.
    async fn set_remove(&self, key: &str, member: &str) -> CollectionStoreResult<()>;

    /// Returns every member of the set at `key`; empty if the set does not exist.
    async fn set_members(&self, key: &str) -> CollectionStoreResult<Vec<String>>;

    /// Returns `true` if `member` belongs to the set at `key`.
    async fn set_contains(&self, key: &str, member: &str) -> CollectionStoreResult<bool>;

    /// Stores `value` at `key` and adds `member` to the set at `index`.
    ///
    /// The default issues the two commands one after the other. Clients able to apply
    /// both as one unit should override it.
    async fn put_indexed(
        &self,
        key: &str,
        value: Vec<u8>,
        index: &str,
        member: &str,
    ) -> CollectionStoreResult<()> {
        self.set(key, value).await?;
        self.set_add(index, member).await
    }

    /// Removes `key` and removes `member` from the set at `index`.
    ///
    /// Both removals are attempted even if one target is already gone. The default
    /// drops the index entry before the value, so an interrupted pair leaves at most a
    /// stale index entry, never an unindexed value.
    async fn delete_indexed(&self, key: &str, index: &str, member: &str) -> CollectionStoreResult<()> {
        self.set_remove(index, member).await?;
        self.delete(key).await
    }

    /// Removes every key in `keys` and exactly the given `members` from the set at `index`.
    ///
    /// Members added to `index` by concurrent writers are left alone. The default removes
    /// the index entries first and the values second; clients able to apply both as one
    /// unit should override it.
    async fn delete_all_indexed(
        &self,
        keys: Vec<String>,
        index: &str,
        members: Vec<String>,
    ) -> CollectionStoreResult<()> {
        for member in &members {
            self.set_remove(index, member).await?;
        }

        self.delete_many(keys).await
    }

    /// Closes the client's connections. The default is a no-op.
    async fn shutdown(self) -> CollectionStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

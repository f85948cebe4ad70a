use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError, aio::ConnectionManager};
use std::fmt;
use tracing::info;

use reclayer_core::error::{CollectionStoreError, CollectionStoreResult};
use reclayer_kv::{KeyValueClient, KeyValueStore};

/// A [`KeyValueStore`] persisting collections in Redis.
pub type RedisStore = KeyValueStore<RedisClient>;

/// Maps a Redis error onto the store's error taxonomy.
///
/// Anything that means the server could not be reached becomes `BackendUnavailable`;
/// errors the server itself reported stay `Backend`.
pub(crate) fn map_redis_error(err: RedisError) -> CollectionStoreError {
    if err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
    {
        CollectionStoreError::BackendUnavailable(err.to_string())
    } else {
        CollectionStoreError::Backend(err.to_string())
    }
}

/// Redis-backed [`KeyValueClient`].
///
/// Cloning is cheap: clones share one multiplexed connection that reconnects on its own.
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    url: String,
}

impl fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl RedisClient {
    pub fn new(manager: ConnectionManager, url: impl Into<String>) -> Self {
        Self { manager, url: url.into() }
    }

    pub fn builder(url: &str) -> RedisClientBuilder {
        RedisClientBuilder::new(url)
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl KeyValueClient for RedisClient {
    async fn get(&self, key: &str) -> CollectionStoreResult<Option<Vec<u8>>> {
        let value: Option<Vec<u8>> = self
            .connection()
            .get(key)
            .await
            .map_err(map_redis_error)?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> CollectionStoreResult<()> {
        let _: () = self
            .connection()
            .set(key, value.as_slice())
            .await
            .map_err(map_redis_error)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> CollectionStoreResult<()> {
        let _: () = self
            .connection()
            .del(key)
            .await
            .map_err(map_redis_error)?;

        Ok(())
    }

    async fn delete_many(&self, keys: Vec<String>) -> CollectionStoreResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let _: () = self
            .connection()
            .del(keys)
            .await
            .map_err(map_redis_error)?;

        Ok(())
    }

    async fn increment(&self, key: &str) -> CollectionStoreResult<i64> {
        let value: i64 = self
            .connection()
            .incr(key, 1_i64)
            .await
            .map_err(map_redis_error)?;

        Ok(value)
    }

    async fn set_add(&self, key: &str, member: &str) -> CollectionStoreResult<()> {
        let _: () = self
            .connection()
            .sadd(key, member)
            .await
            .map_err(map_redis_error)?;

        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> CollectionStoreResult<()> {
        let _: () = self
            .connection()
            .srem(key, member)
            .await
            .map_err(map_redis_error)?;

        Ok(())
    }

    async fn set_members(&self, key: &str) -> CollectionStoreResult<Vec<String>> {
        let members: Vec<String> = self
            .connection()
            .smembers(key)
            .await
            .map_err(map_redis_error)?;

        Ok(members)
    }

    async fn set_contains(&self, key: &str, member: &str) -> CollectionStoreResult<bool> {
        let found: bool = self
            .connection()
            .sismember(key, member)
            .await
            .map_err(map_redis_error)?;

        Ok(found)
    }

    async fn put_indexed(
        &self,
        key: &str,
        value: Vec<u8>,
        index: &str,
        member: &str,
    ) -> CollectionStoreResult<()> {
        let mut con = self.connection();

        // MULTI/EXEC: the record and its index entry land together or not at all.
        let _: () = redis::pipe()
            .atomic()
            .set(key, value.as_slice())
            .ignore()
            .sadd(index, member)
            .ignore()
            .query_async(&mut con)
            .await
            .map_err(map_redis_error)?;

        Ok(())
    }

    async fn delete_indexed(&self, key: &str, index: &str, member: &str) -> CollectionStoreResult<()> {
        let mut con = self.connection();

        let _: () = redis::pipe()
            .atomic()
            .srem(index, member)
            .ignore()
            .del(key)
            .ignore()
            .query_async(&mut con)
            .await
            .map_err(map_redis_error)?;

        Ok(())
    }

    async fn delete_all_indexed(
        &self,
        keys: Vec<String>,
        index: &str,
        members: Vec<String>,
    ) -> CollectionStoreResult<()> {
        if keys.is_empty() && members.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        if !keys.is_empty() {
            pipe.del(keys).ignore();
        }
        // SREM of the listed members only: ids indexed after they were read survive.
        if !members.is_empty() {
            pipe.srem(index, members).ignore();
        }

        let mut con = self.connection();
        let _: () = pipe.query_async(&mut con).await.map_err(map_redis_error)?;

        Ok(())
    }
}

/// Builder for [`RedisClient`].
#[derive(Debug)]
pub struct RedisClientBuilder {
    url: String,
}

impl RedisClientBuilder {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string() }
    }

    /// Opens the connection manager.
    ///
    /// # Errors
    ///
    /// Returns `Initialization` if the URL is invalid or the first connection fails.
    pub async fn build(self) -> CollectionStoreResult<RedisClient> {
        let manager = Client::open(self.url.as_str())
            .map_err(|e| CollectionStoreError::Initialization(e.to_string()))?
            .get_connection_manager()
            .await
            .map_err(|e| CollectionStoreError::Initialization(e.to_string()))?;

        info!(url = %self.url, "connected to redis");

        Ok(RedisClient::new(manager, self.url))
    }
}

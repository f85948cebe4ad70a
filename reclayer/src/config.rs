//! Runtime backend selection.
//!
//! [`StoreConfig`] describes which backend a [`DynRecordStore`] should run on. It can be
//! deserialized from any serde source or read from the environment:
//!
//! | variable             | meaning                                      | default               |
//! |----------------------|----------------------------------------------|-----------------------|
//! | `RECLAYER_BACKEND`   | `memory`, `memory-kv` or `redis`             | `memory`              |
//! | `RECLAYER_REDIS_URL` | Redis connection URL                         | `redis://127.0.0.1/`  |
//! | `RECLAYER_NAMESPACE` | key prefix for key-value backends            | none                  |

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::info;

use reclayer_core::{
    backend::StoreBackendBuilder,
    error::{CollectionStoreError, CollectionStoreResult},
    store::{DynRecordStore, RecordStore},
};
use reclayer_kv::{KeyValueClient, KeyValueStore, KeyValueStoreBuilder, MemoryKeyValueClient};
use reclayer_memory::InMemoryStore;

pub const ENV_BACKEND: &str = "RECLAYER_BACKEND";
pub const ENV_REDIS_URL: &str = "RECLAYER_REDIS_URL";
pub const ENV_NAMESPACE: &str = "RECLAYER_NAMESPACE";

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";

/// Which storage backend to run on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Volatile [`InMemoryStore`].
    #[default]
    Memory,
    /// [`KeyValueStore`] over an in-process key-value client. Volatile, but uses the
    /// persistent backend's key layout.
    MemoryKv,
    /// [`KeyValueStore`] over Redis. Requires the `redis` feature.
    Redis,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Memory => "memory",
            BackendKind::MemoryKv => "memory-kv",
            BackendKind::Redis => "redis",
        })
    }
}

impl FromStr for BackendKind {
    type Err = CollectionStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "memory-kv" => Ok(BackendKind::MemoryKv),
            "redis" => Ok(BackendKind::Redis),
            other => Err(CollectionStoreError::Initialization(format!(
                "unknown backend {other:?}, expected memory, memory-kv or redis"
            ))),
        }
    }
}

/// Backend configuration for a [`DynRecordStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub redis_url: Option<String>,
    pub namespace: Option<String>,
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Redis,
            redis_url: Some(url.into()),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Reads the configuration from `RECLAYER_*` environment variables.
    pub fn from_env() -> CollectionStoreResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> CollectionStoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            backend: non_empty(ENV_BACKEND)
                .map(|value| value.parse())
                .transpose()?
                .unwrap_or_default(),
            redis_url: non_empty(ENV_REDIS_URL),
            namespace: non_empty(ENV_NAMESPACE),
        })
    }

    /// The Redis URL to connect to, falling back to [`DEFAULT_REDIS_URL`].
    pub fn redis_url(&self) -> &str {
        self.redis_url.as_deref().unwrap_or(DEFAULT_REDIS_URL)
    }

    /// Builds a store on the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `Initialization` if the backend cannot be constructed, including when
    /// `redis` is selected in a build without the `redis` feature.
    pub async fn build(&self) -> CollectionStoreResult<DynRecordStore> {
        info!(backend = %self.backend, namespace = ?self.namespace, "building record store");

        match self.backend {
            BackendKind::Memory => Ok(RecordStore::new(InMemoryStore::builder().build().await?).into_dyn()),
            BackendKind::MemoryKv => Ok(RecordStore::new(
                self.kv_builder(MemoryKeyValueClient::new()).build().await?,
            )
            .into_dyn()),
            BackendKind::Redis => self.build_redis().await,
        }
    }

    fn kv_builder<C: KeyValueClient>(&self, client: C) -> KeyValueStoreBuilder<C> {
        match &self.namespace {
            Some(namespace) => KeyValueStore::builder(client).namespace(namespace.clone()),
            None => KeyValueStore::builder(client),
        }
    }

    #[cfg(feature = "redis")]
    async fn build_redis(&self) -> CollectionStoreResult<DynRecordStore> {
        let client = reclayer_redis::RedisClient::builder(self.redis_url())
            .build()
            .await?;

        Ok(RecordStore::new(self.kv_builder(client).build().await?).into_dyn())
    }

    #[cfg(not(feature = "redis"))]
    async fn build_redis(&self) -> CollectionStoreResult<DynRecordStore> {
        Err(CollectionStoreError::Initialization(
            "the redis backend requires the `redis` feature".to_string(),
        ))
    }
}

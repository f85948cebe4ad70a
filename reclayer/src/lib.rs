//! Main reclayer crate providing typed record collections over interchangeable backends.
//!
//! This crate is the primary entry point. It re-exports the core types from the
//! sub-crates, ships the [`Todo`](todo::Todo) record of the TodoMVC backend, and can
//! pick a backend at runtime from [`config`].
//!
//! # Features
//!
//! - **Uniform CRUD** - `get`, `update` (upsert), `delete`, `delete_all`, `get_all` and `next_key` on every backend
//! - **Race-free identities** - `next_key` never hands the same id to two callers
//! - **Multiple backends** - Volatile in-memory storage, or any Redis-like key-value server
//!
//! # Quick Start
//!
//! ```ignore
//! use reclayer::{prelude::*, memory::InMemoryStore, todo::Todo};
//!
//! #[tokio::main]
//! async fn main() -> CollectionStoreResult<()> {
//!     let store = RecordStore::new(InMemoryStore::builder().build().await?);
//!     let todos = store.collection::<Todo>();
//!
//!     // Server-assigned id.
//!     let id = todos.next_key().await?;
//!     todos.update(id, Todo::new(id, "buy milk")).await?;
//!
//!     // Field-level patching is read, modify, write back.
//!     if let Some(mut todo) = todos.get(id).await? {
//!         todo.completed = true;
//!         todos.update(id, todo).await?;
//!     }
//!
//!     println!("{:?}", todos.get_all().await?);
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Runtime Backend Selection
//!
//! ```ignore
//! use reclayer::{prelude::*, config::StoreConfig, todo::Todo};
//!
//! #[tokio::main]
//! async fn main() -> CollectionStoreResult<()> {
//!     // RECLAYER_BACKEND=redis RECLAYER_REDIS_URL=redis://127.0.0.1/
//!     let store = StoreConfig::from_env()?.build().await?;
//!     let todos = store.collection::<Todo>();
//!
//!     todos.delete_all().await?;
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Volatile in-memory storage
//! - [`kv`] - Persistent storage in a key-value server
//! - `redis` - Redis client for [`kv`] (requires `redis` feature)

pub mod config;
pub mod prelude;
pub mod todo;

pub use reclayer_core::{backend, collection, error, record, store};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend.
pub mod memory {
    pub use reclayer_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// Key-value storage backend.
pub mod kv {
    pub use reclayer_kv::{KeyValueClient, KeyValueStore, KeyValueStoreBuilder, MemoryKeyValueClient};
}

/// Redis client for the key-value backend.
///
/// This module is only available when the `redis` feature is enabled.
#[cfg(feature = "redis")]
pub mod redis {
    pub use reclayer_redis::{RedisClient, RedisClientBuilder, RedisStore};
}

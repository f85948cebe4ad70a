//! Key-value record storage backend for reclayer.
//!
//! This crate persists record collections in any key-value server that offers plain
//! values, atomic integer counters and string sets, the command set of Redis and its
//! relatives. The server is reached through the [`KeyValueClient`] trait; a Redis
//! implementation lives in the `reclayer-redis` crate, and [`MemoryKeyValueClient`]
//! runs the same store in-process.
//!
//! # Features
//!
//! - **Race-free ids** - Identities come from the server's atomic increment, never from local state
//! - **Index set** - Live ids are tracked per collection so enumeration never scans the keyspace
//! - **Type-preserving encoding** - Records are stored as BSON documents
//! - **Namespaces** - Optional key prefix to share one server between applications
//!
//! # Example
//!
//! ```ignore
//! use reclayer::{prelude::*, kv::{KeyValueStore, MemoryKeyValueClient}, todo::Todo};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = KeyValueStore::builder(MemoryKeyValueClient::new())
//!         .namespace("todo-app")
//!         .build()
//!         .await?;
//!     let store = RecordStore::new(backend);
//!
//!     let todo = store.collection::<Todo>().create(|id| Todo::new(id, "buy milk")).await?;
//!     assert_eq!(todo.id, 1);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as reclayer_kv;

pub mod client;
pub mod codec;
pub mod memory;
pub mod store;

pub use client::KeyValueClient;
pub use memory::MemoryKeyValueClient;
pub use store::{KeyValueStore, KeyValueStoreBuilder};

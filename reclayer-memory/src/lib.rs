//! In-memory record storage backend for reclayer.
//!
//! This crate provides a volatile, thread-safe implementation of the `StoreBackend` trait.
//! It is intended for development, tests and single-process deployments where losing
//! every record on restart is acceptable.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes through an async-aware RwLock
//! - **Race-free key allocation** - Per-collection counters advanced under the write lock
//! - **Value semantics** - Callers always receive copies of stored records
//!
//! # Quick Start
//!
//! ```ignore
//! use reclayer::{prelude::*, memory::InMemoryStore, todo::Todo};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RecordStore::new(InMemoryStore::builder().build().await?);
//!     let todos = store.collection::<Todo>();
//!
//!     let id = todos.next_key().await?;
//!     todos.update(id, Todo::new(id, "buy milk")).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as reclayer_memory;

pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};

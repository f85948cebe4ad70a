//! Redis client for the reclayer key-value backend.
//!
//! This crate implements [`KeyValueClient`](reclayer_kv::KeyValueClient) over a shared,
//! automatically reconnecting Redis connection, so a
//! [`KeyValueStore`](reclayer_kv::KeyValueStore) can persist collections in Redis.
//!
//! To use this backend, include the `redis` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! reclayer = { version = "x.y.z", features = ["redis"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use reclayer::{prelude::*, kv::KeyValueStore, redis::RedisClient, todo::Todo};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RedisClient::builder("redis://127.0.0.1/").build().await?;
//!     let store = RecordStore::new(KeyValueStore::new(client));
//!
//!     let todos = store.collection::<Todo>().get_all().await?;
//!     println!("{} todos", todos.len());
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as reclayer_redis;

pub mod client;

pub use client::{RedisClient, RedisClientBuilder, RedisStore};

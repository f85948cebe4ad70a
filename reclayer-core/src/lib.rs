//! A thin typed record collection abstraction layer.
//!
//! This crate is the core of the reclayer project and provides:
//!
//! - **Record traits** ([`record`]) - The [`Record`](record::Record) trait and its BSON/JSON conversions
//! - **Store backend abstraction** ([`backend`]) - Traits implemented by volatile and persistent backends
//! - **Collections interface** ([`collection`]) - The typed `get`/`update`/`delete`/`delete_all`/`get_all`/`next_key` API
//! - **Record store** ([`store`]) - Owns a backend and hands out collection handles
//! - **Error handling** ([`error`]) - Error taxonomy and result type
//!
//! # Example
//!
//! ```ignore
//! use reclayer::record::{Record, RecordId};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Note {
//!     pub id: RecordId,
//!     pub body: String,
//! }
//!
//! impl Record for Note {
//!     fn id(&self) -> RecordId {
//!         self.id
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "notes"
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as reclayer_core;

pub mod backend;
pub mod collection;
pub mod error;
pub mod record;
pub mod store;

//! Convenient re-exports of commonly used types from reclayer.
//!
//! ```ignore
//! use reclayer::prelude::*;
//! ```

pub use reclayer_core::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    collection::CollectionStore,
    error::{CollectionStoreError, CollectionStoreResult},
    record::{Record, RecordExt, RecordId},
    store::{DynRecordStore, RecordStore},
};

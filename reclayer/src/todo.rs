//! The TodoMVC record.

use serde::{Deserialize, Serialize};

use reclayer_core::record::{Record, RecordId};

/// A single todo item.
///
/// `completed` and `order` may be omitted on input and default to `false` and `0`.
/// `order` is only a client-side sort hint; the store keeps no ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub order: i64,
}

impl Todo {
    pub fn new(id: RecordId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            completed: false,
            order: 0,
        }
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }
}

impl Record for Todo {
    fn id(&self) -> RecordId {
        self.id
    }

    fn collection_name() -> &'static str {
        "todos"
    }
}

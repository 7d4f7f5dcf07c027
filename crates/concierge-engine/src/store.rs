//! Durable record seam.
//!
//! Call completions and request audit records are persisted through
//! [`RecordStore`]. Persistence is advisory: the coordinator spawns writes
//! off the hot path and logs failures instead of surfacing them, so a
//! missing or broken store degrades to in-memory-only operation.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

/// Failure writing to or reading from the backing store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store rejected the record or the backend is unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// No record exists under the given key.
    #[error("record '{0}' not found")]
    NotFound(String),
}

/// Append-oriented store for engine artifacts.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one record under `kind`, returning its storage key.
    async fn persist(&self, kind: &str, record: Value) -> Result<String, StoreError>;

    /// Load a previously persisted record.
    async fn load(&self, kind: &str, key: &str) -> Result<Value, StoreError>;
}

/// In-memory store used in tests and when no backend is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn key(kind: &str, id: &str) -> String {
        format!("{kind}/{id}")
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn persist(&self, kind: &str, record: Value) -> Result<String, StoreError> {
        let id = uuid_like_key(&record);
        let key = Self::key(kind, &id);
        self.records.lock().insert(key, record);
        Ok(id)
    }

    async fn load(&self, kind: &str, key: &str) -> Result<Value, StoreError> {
        self.records
            .lock()
            .get(&Self::key(kind, key))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_owned()))
    }
}

/// Prefer an `id` field embedded in the record; otherwise mint one.
fn uuid_like_key(record: &Value) -> String {
    record
        .get("id")
        .and_then(Value::as_str)
        .map_or_else(|| uuid::Uuid::now_v7().to_string(), str::to_owned)
}

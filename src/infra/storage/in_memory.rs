// In-memory implementation of KvStore.
//
// Nothing survives the process. Useful for tests and for running the store
// without touching the disk.

use crate::core::storage::{KvStore, StoreError};
use dashmap::DashMap;

/// DashMap-backed key-value store. Safe to share between threads.
pub struct InMemoryKvStore {
    data: DashMap<String, String>,
}

impl InMemoryKvStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvStore for InMemoryKvStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

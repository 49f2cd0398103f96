// Storage port - the only thing the core knows about persistence.
//
// The moderation store keeps its whole state in one string blob under one key.
// Implementations live in infra/.

use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Opaque get/set string-blob key-value store.
pub trait KvStore: Send + Sync {
    /// Read the blob stored under `key`, or `None` if nothing was ever saved.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite the blob stored under `key`.
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// Lets callers keep a handle on the adapter they hand to the store.
impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).save(key, value)
    }
}

// Allows picking the backend at runtime.
impl KvStore for Box<dyn KvStore> {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).save(key, value)
    }
}

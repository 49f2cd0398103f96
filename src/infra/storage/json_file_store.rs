use crate::core::storage::{KvStore, StoreError};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// JSON file-backed key-value store. All keys live in a single file as a map:
/// { key: value }
///
/// Reads are served from an in-memory copy; every save rewrites the file.
pub struct JsonFileKvStore {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, String>>,
}

impl JsonFileKvStore {
    /// Open the store at `path`. A missing file is treated as empty and is
    /// created on the first save.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let cache: BTreeMap<String, String> = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            serde_json::from_reader(reader)?
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened JSON store at {} ({} keys)", path.display(), cache.len());
        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, cache: &BTreeMap<String, String>) -> Result<(), StoreError> {
        // Write next to the target and rename so a crash never leaves half a file
        let tmp_path = self.path.with_extension("json.tmp");
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer_pretty(&mut writer, cache)?;
        writer.flush()?;
        drop(writer);
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KvStore for JsonFileKvStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let cache = self.cache.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(cache.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut cache = self.cache.write().map_err(|_| StoreError::LockPoisoned)?;
        let previous = cache.insert(key.to_string(), value.to_string());

        // Hold the lock while writing so saves land on disk in order
        if let Err(e) = self.persist(&cache) {
            match previous {
                Some(old) => cache.insert(key.to_string(), old),
                None => cache.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::HashingConfig;
    use crate::core::moderation::{ModerationConfig, ModerationStore, Role};
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_json_persistence_roundtrip() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_owned();
        drop(tmp);

        let store = JsonFileKvStore::open(path.clone()).unwrap();
        assert_eq!(store.load("globalListData").unwrap(), None);
        store.save("globalListData", "{\"a\":1}").unwrap();
        store.save("other", "plain text").unwrap();

        // Reload from file
        let store2 = JsonFileKvStore::open(path.clone()).unwrap();
        assert_eq!(
            store2.load("globalListData").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(store2.load("other").unwrap().as_deref(), Some("plain text"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "this is not json").unwrap();

        let result = JsonFileKvStore::open(tmp.path());
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_failed_write_keeps_cache_consistent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("data.json");

        let store = JsonFileKvStore::open(&path).unwrap();
        assert!(matches!(store.save("k", "v"), Err(StoreError::Io(_))));
        assert_eq!(store.load("k").unwrap(), None);
    }

    #[test]
    fn test_moderation_state_survives_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("modlist.json");
        let config = ModerationConfig {
            hashing: HashingConfig::minimal(),
            ..Default::default()
        };

        {
            let kv = JsonFileKvStore::open(&path).unwrap();
            let mut store = ModerationStore::open(kv, config.clone()).unwrap();
            store.register("Gaidrs", "ownerpass").unwrap();
            store.register("alice", "pw").unwrap();
            store.promote("alice", "Gaidrs").unwrap();
            let id = store.propose_add("Widget", "alice").unwrap();
            store.approve(id, "alice").unwrap();
            store.propose_add("Gadget", "alice").unwrap();
        }

        let kv = JsonFileKvStore::open(&path).unwrap();
        let mut store = ModerationStore::open(kv, config).unwrap();
        assert_eq!(store.list_approved_items(), vec!["Widget"]);
        assert_eq!(store.list_pending_changes().len(), 1);
        assert_eq!(store.list_history().len(), 1);
        assert_eq!(store.user_role("alice"), Some(Role::Moderator));
        assert!(store.current_session().is_none());
        store.login("alice", "pw").unwrap();
    }
}

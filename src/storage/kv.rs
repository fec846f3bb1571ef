//! Key-value persistence of JSON documents.
//!
//! Each key is one file, rewritten wholesale on every `set`. There is no locking:
//! two processes writing the same key race and the last write wins.

use crate::error::{Result, VoxError};
use std::fs;
use std::path::{Path, PathBuf};

/// String-valued key-value persistence.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrites the value for `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (and creates if needed) a store rooted at `<data_dir>/store`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join("store");
        fs::create_dir_all(&dir)
            .map_err(|e| VoxError::storage(format!("Failed to create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VoxError::storage(format!("Failed to read {}: {e}", path.display()))),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)
            .and_then(|_| fs::rename(&staging, &path))
            .map_err(|e| VoxError::storage(format!("Failed to write {}: {e}", path.display())))?;
        tracing::debug!("Persisted key '{}' ({} bytes)", key, value.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("voice_recorder_theme").unwrap(), None);
    }

    #[test]
    fn set_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        store.set("voice_recorder_theme", "\"light\"").unwrap();
        store.set("voice_recorder_theme", "\"dark\"").unwrap();
        assert_eq!(
            store.get("voice_recorder_theme").unwrap().as_deref(),
            Some("\"dark\"")
        );
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = JsonFileStore::open(dir.path()).unwrap();
            store.set("k", "[1,2,3]").unwrap();
        }
        let reopened = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn keys_are_sanitized_into_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(dir.path()).unwrap();
        store.set("../escape", "1").unwrap();
        assert!(dir.path().join("store").join("___escape.json").exists());
    }
}

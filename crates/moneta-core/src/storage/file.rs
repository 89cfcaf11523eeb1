//! Filesystem-backed key-value store.
//!
//! Every key lives in one JSON object on disk. A write serializes the whole
//! object to `<file>.tmp` and renames it over the original, so the file is
//! always either the previous or the next state, never a mix.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use super::{KeyValueStore, WriteBatch};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading existing contents if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = Self::read_file(&path)?;
        debug!(path = %path.display(), keys = entries.len(), "Opened file store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn read_file(path: &Path) -> Result<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read store file: {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse store file: {}", path.display()))
    }

    fn write_file(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write store file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace store file: {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("File store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("File store lock poisoned"))?;
        Ok(keys.iter().map(|k| entries.get(*k).cloned()).collect())
    }

    fn apply(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("File store lock poisoned"))?;

        // Memory is only updated once the file is safely replaced.
        let mut next = entries.clone();
        batch.apply_to(&mut next);
        self.write_file(&next)?;
        *entries = next;
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("File store lock poisoned"))?;
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove store file: {}", self.path.display()))?;
        }
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("session.json")).unwrap();
        assert_eq!(store.get("auth_token").unwrap(), None);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::open(&path).unwrap();
        store
            .apply(WriteBatch::new().set("auth_token", "abc").set("isLoggedIn", "true"))
            .unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("auth_token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("isLoggedIn").unwrap().as_deref(), Some("true"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(FileStore::open(&path).is_err());
    }

    #[test]
    fn test_clear_all_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();
        store.apply(WriteBatch::new().set("k", "v")).unwrap();
        assert!(path.exists());

        store.clear_all().unwrap();
        assert!(!path.exists());
        assert_eq!(store.get("k").unwrap(), None);

        // Clearing an already-empty store is fine.
        store.clear_all().unwrap();
    }

    #[test]
    fn test_empty_batch_skips_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::open(&path).unwrap();

        store.apply(WriteBatch::new()).unwrap();
        assert!(!path.exists());
    }
}

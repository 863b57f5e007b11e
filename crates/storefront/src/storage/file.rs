//! File-backed storage backend.
//!
//! All keys live in one JSON object file. Every write re-reads the file,
//! applies the change and replaces the file atomically (write to a sibling
//! temp file, then rename), so a crash never leaves a half-written store.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::{KeyValueStore, StorageError};

/// A [`KeyValueStore`] persisted to a JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) a store at `path`.
    ///
    /// The parent directory is created if missing. The file itself is only
    /// created on the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "Opened file store");
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every key. A missing file is an empty store; a corrupt file is
    /// logged and also treated as empty.
    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Storage file is corrupt, starting empty");
            BTreeMap::new()
        }))
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut values = self.load()?;
        f(&mut values);
        self.persist(&values)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.modify(|values| {
            values.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.modify(|values| {
            values.remove(key);
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = FileStore::open(&path).unwrap();
        store.set("guestCart", "[{\"product_id\":1,\"quantity\":2}]").unwrap();
        store.set("token", "abc").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("guestCart").unwrap().as_deref(),
            Some("[{\"product_id\":1,\"quantity\":2}]")
        );
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("storage.json")).unwrap();
        assert_eq!(store.get("guestCart").unwrap(), None);
        store.remove("guestCart").unwrap();
    }

    #[test]
    fn test_corrupt_file_reads_empty_and_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("token").unwrap(), None);

        store.set("token", "fresh").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_remove_deletes_only_that_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("storage.json")).unwrap();
        store.set("guestCart", "[]").unwrap();
        store.set("checkoutData", "{}").unwrap();

        store.remove("checkoutData").unwrap();
        assert_eq!(store.get("checkoutData").unwrap(), None);
        assert_eq!(store.get("guestCart").unwrap().as_deref(), Some("[]"));
    }
}

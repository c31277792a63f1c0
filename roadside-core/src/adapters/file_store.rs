//! File-backed key/value storage
//!
//! All keys live in one `storage.json` object inside the profile directory.
//! Writers take an exclusive lock on `storage.lock` and replace the file via
//! a temp file rename, so a concurrent reader sees either the old or the new
//! map, never a partial one.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::domain::result::{Error, Result};
use crate::ports::StorageBackend;

const STORAGE_FILE: &str = "storage.json";
const LOCK_FILE: &str = "storage.lock";

/// Storage backed by a JSON file in the profile directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STORAGE_FILE)
    }

    fn lock(&self) -> Result<File> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))?;
        lock.lock_exclusive()?;
        Ok(lock)
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let path = self.path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| Error::storage(format!("{} is corrupt: {}", path.display(), e)))
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(serde_json::to_string_pretty(map)?.as_bytes())?;
        temp.flush()?;
        temp.persist(self.path())
            .map_err(|e| Error::storage(format!("Failed to replace storage file: {}", e)))?;
        Ok(())
    }

    /// Apply `f` to the map while holding the write lock
    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let lock = self.lock()?;
        // A corrupt file is replaced rather than blocking every future write
        let mut map = self.load().unwrap_or_default();
        f(&mut map);
        let result = self.save(&map);
        FileExt::unlock(&lock)?;
        result
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.update(|map| {
            map.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::LocalStore;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_set_get_remove() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.set_item("k", "\"v\"").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("\"v\""));
        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        FileStorage::new(dir.path()).unwrap().set_item("a", "1").unwrap();

        let reopened = FileStorage::new(dir.path()).unwrap();
        assert_eq!(reopened.get_item("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_corrupt_file_reads_as_fallback() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        fs::write(storage.path(), "{not json").unwrap();

        assert!(storage.get_item("a").is_err());

        let store = LocalStore::new(Arc::new(storage.clone()));
        assert_eq!(store.read::<Vec<String>>("a", vec![]), Vec::<String>::new());

        // Writing recovers the file
        store.write("a", &vec!["x".to_string()]);
        assert_eq!(store.read::<Vec<String>>("a", vec![]), vec!["x".to_string()]);
    }
}

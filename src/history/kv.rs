use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;

use super::HistoryError;

/// String-keyed blob storage (the shape of browser local storage).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError>;

    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Arc<K> {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        (**self).set(key, value)
    }
}

/// Process-local key/value store.
#[derive(Debug, Default)]
pub struct MemoryKv {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        let values = self.values.lock().map_err(|_| HistoryError::LockPoisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        let mut values = self.values.lock().map_err(|_| HistoryError::LockPoisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so a reader sees either the old blob or the new one.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Create the directory if needed.
    pub fn open(dir: &Path) -> Result<Self, HistoryError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HistoryError::Io(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        let target = self.path_for(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| HistoryError::Io(e.error))?;
        tracing::debug!(path = %target.display(), bytes = value.len(), "Wrote key file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_kv_get_set() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("k").unwrap(), None);
        kv.set("k", "v1").unwrap();
        kv.set("k", "v2").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn file_kv_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKv::open(dir.path()).unwrap();
        assert_eq!(kv.get("scannedMedicines").unwrap(), None);
    }

    #[test]
    fn file_kv_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKv::open(&dir.path().join("nested")).unwrap();
        kv.set("scannedMedicines", "[1]").unwrap();
        kv.set("scannedMedicines", "[1,2]").unwrap();
        assert_eq!(kv.get("scannedMedicines").unwrap().as_deref(), Some("[1,2]"));

        let files: Vec<_> = std::fs::read_dir(kv.dir())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files, vec!["scannedMedicines.json"]);
    }

    #[test]
    fn file_kv_sanitizes_key_names() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKv::open(dir.path()).unwrap();
        kv.set("../escape", "x").unwrap();
        assert!(dir.path().join("___escape.json").exists());
        assert_eq!(kv.get("../escape").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn file_kv_shared_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        FileKv::open(dir.path()).unwrap().set("k", "persisted").unwrap();
        let reopened = FileKv::open(dir.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("persisted"));
    }
}

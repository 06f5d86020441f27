//! Medicine scan history.
//!
//! A flat list of per-medicine records, deduplicated by case-insensitive
//! name and persisted in full after every change. Storage sits behind
//! [`HistoryStore`]; the JSON blob layout is shared by every key/value
//! backend so data moves between them unchanged.

pub mod kv;
pub mod normalize;
pub mod recorder;
pub mod sqlite;
pub mod store;

pub use kv::*;
pub use normalize::*;
pub use recorder::*;
pub use sqlite::*;
pub use store::*;

use std::path::Path;

use thiserror::Error;

use crate::config;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored scan history is not valid JSON: {0}")]
    Corrupt(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Storage write rejected: {0}")]
    WriteRejected(String),
}

/// File-backed history under `data_dir` (usually [`config::app_data_dir`]).
pub fn open_file_history(data_dir: &Path) -> Result<KeyValueHistoryStore<FileKv>, HistoryError> {
    let dir = config::history_file_dir(data_dir);
    tracing::info!(dir = %dir.display(), "Opening file-backed scan history");
    Ok(KeyValueHistoryStore::new(FileKv::open(&dir)?))
}

/// SQLite-backed history in `data_dir`.
pub fn open_sqlite_history(data_dir: &Path) -> Result<KeyValueHistoryStore<SqliteKv>, HistoryError> {
    let path = config::history_db_path(data_dir);
    tracing::info!(path = %path.display(), "Opening SQLite scan history");
    Ok(KeyValueHistoryStore::new(SqliteKv::open(&path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backends_share_blob_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = MedicineHistory::mount(open_file_history(dir.path()).unwrap());
        file.record_scan(Some("Paracetamol"), None).unwrap();
        file.record_scan(Some("Amoxicillin"), None).unwrap();

        let blob = file
            .store()
            .kv()
            .get(config::HISTORY_STORAGE_KEY)
            .unwrap()
            .unwrap();
        let sqlite = open_sqlite_history(dir.path()).unwrap();
        sqlite.kv().set(config::HISTORY_STORAGE_KEY, &blob).unwrap();

        let migrated = MedicineHistory::mount(sqlite);
        assert_eq!(migrated.entries(), file.entries());
        assert!(dir.path().join("store").join("scannedMedicines.json").exists());
        assert!(dir.path().join("medscan.db").exists());
    }
}

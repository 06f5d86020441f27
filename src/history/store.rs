use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{parse_history_blob, HistoryError, KeyValueStore};
use crate::config::HISTORY_STORAGE_KEY;
use crate::models::MedicineHistoryEntry;

/// Persistence for the scan history list.
pub trait HistoryStore {
    /// Absent data is an empty list. `Err` means the stored data is unusable.
    fn load(&self) -> Result<Vec<MedicineHistoryEntry>, HistoryError>;

    /// Replace the stored list. Must be durable when it returns `Ok`.
    fn save(&self, entries: &[MedicineHistoryEntry]) -> Result<(), HistoryError>;
}

impl<S: HistoryStore + ?Sized> HistoryStore for Arc<S> {
    fn load(&self) -> Result<Vec<MedicineHistoryEntry>, HistoryError> {
        (**self).load()
    }

    fn save(&self, entries: &[MedicineHistoryEntry]) -> Result<(), HistoryError> {
        (**self).save(entries)
    }
}

/// Stores the list as a JSON array under one key of a [`KeyValueStore`].
pub struct KeyValueHistoryStore<K> {
    kv: K,
    key: String,
}

impl<K: KeyValueStore> KeyValueHistoryStore<K> {
    /// Uses the standard `scannedMedicines` key.
    pub fn new(kv: K) -> Self {
        Self::with_key(kv, HISTORY_STORAGE_KEY)
    }

    pub fn with_key(kv: K, key: &str) -> Self {
        Self {
            kv,
            key: key.to_string(),
        }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }
}

impl<K: KeyValueStore> HistoryStore for KeyValueHistoryStore<K> {
    fn load(&self) -> Result<Vec<MedicineHistoryEntry>, HistoryError> {
        match self.kv.get(&self.key)? {
            None => Ok(Vec::new()),
            Some(raw) => parse_history_blob(&raw),
        }
    }

    fn save(&self, entries: &[MedicineHistoryEntry]) -> Result<(), HistoryError> {
        let blob = serde_json::to_string(entries)?;
        self.kv.set(&self.key, &blob)
    }
}

/// In-memory fake with failure injection for tests.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: Mutex<Vec<MedicineHistoryEntry>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<MedicineHistoryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Self::default()
        }
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<MedicineHistoryEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<MedicineHistoryEntry>, HistoryError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(HistoryError::Corrupt("injected load failure".into()));
        }
        let entries = self.entries.lock().map_err(|_| HistoryError::LockPoisoned)?;
        Ok(entries.clone())
    }

    fn save(&self, entries: &[MedicineHistoryEntry]) -> Result<(), HistoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(HistoryError::WriteRejected("injected save failure".into()));
        }
        let mut stored = self.entries.lock().map_err(|_| HistoryError::LockPoisoned)?;
        *stored = entries.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{MemoryKv, SqliteKv};
    use chrono::{TimeZone, Utc};

    fn entry(id: i64, name: &str) -> MedicineHistoryEntry {
        MedicineHistoryEntry {
            id,
            name: name.into(),
            scan_count: 1,
            last_scanned: Some(Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()),
            details: None,
        }
    }

    #[test]
    fn kv_store_first_run_is_empty() {
        let store = KeyValueHistoryStore::new(MemoryKv::new());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn kv_store_round_trip() {
        let store = KeyValueHistoryStore::new(MemoryKv::new());
        let entries = vec![entry(1, "Paracetamol"), entry(2, "Amoxicillin")];
        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), entries);
        assert!(store.kv().get("scannedMedicines").unwrap().is_some());
    }

    #[test]
    fn kv_store_reports_corruption() {
        let kv = MemoryKv::new();
        kv.set("scannedMedicines", "<<tampered>>").unwrap();
        let store = KeyValueHistoryStore::new(kv);
        assert!(matches!(store.load(), Err(HistoryError::Corrupt(_))));
    }

    #[test]
    fn kv_store_over_sqlite() {
        let store = KeyValueHistoryStore::new(SqliteKv::open_in_memory().unwrap());
        store.save(&[entry(7, "Lisinopril")]).unwrap();
        assert_eq!(store.load().unwrap()[0].name, "Lisinopril");
    }

    #[test]
    fn custom_key_is_isolated() {
        let kv = Arc::new(MemoryKv::new());
        let a = KeyValueHistoryStore::with_key(kv.clone(), "a");
        let b = KeyValueHistoryStore::with_key(kv, "b");
        a.save(&[entry(1, "A")]).unwrap();
        assert!(b.load().unwrap().is_empty());
    }

    #[test]
    fn memory_store_failure_injection() {
        let store = MemoryHistoryStore::with_entries(vec![entry(1, "A")]);
        store.set_fail_saves(true);
        assert!(store.save(&[]).is_err());
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(store.save_count(), 0);

        store.set_fail_loads(true);
        assert!(store.load().is_err());
    }
}

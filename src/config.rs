use std::path::{Path, PathBuf};

/// Application-level constants
pub const APP_NAME: &str = "Medscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Storage key holding the JSON-serialized scan history.
pub const HISTORY_STORAGE_KEY: &str = "scannedMedicines";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "MEDSCAN_DATA_DIR";

/// Get the application data directory.
/// `$MEDSCAN_DATA_DIR` when set, otherwise ~/Medscan/ on all platforms.
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Subdirectory of the data directory used by the file-backed store.
pub const HISTORY_FILE_SUBDIR: &str = "store";

/// Database file in the data directory used by the SQLite-backed store.
pub const HISTORY_DB_FILE: &str = "medscan.db";

/// Directory used by the file-backed key/value store.
pub fn history_file_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(HISTORY_FILE_SUBDIR)
}

/// SQLite database used by the SQLite-backed key/value store.
pub fn history_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(HISTORY_DB_FILE)
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "medscan_lib=debug,info"
    } else {
        "medscan_lib=info,warn"
    }
}

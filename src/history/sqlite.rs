use std::path::Path;

use rusqlite::{params, Connection};

use super::{HistoryError, KeyValueStore};

const SCHEMA_VERSION: i64 = 1;

const MIGRATION_V1: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
INSERT OR IGNORE INTO schema_version (version) VALUES (1);
";

/// Key/value store backed by a single SQLite table.
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    /// Open a SQLite database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute_batch("PRAGMA journal_mode=DELETE;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Run all pending migrations
fn run_migrations(conn: &Connection) -> Result<(), HistoryError> {
    let current_version = get_current_version(conn);
    if current_version < SCHEMA_VERSION {
        tracing::info!("Running kv_store migration v{SCHEMA_VERSION}");
        conn.execute_batch(MIGRATION_V1)?;
    }
    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv_store WHERE key = ?1")?;
        match stmt.query_row([key], |row| row.get::<_, String>(0)) {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(HistoryError::from(e)),
        }
    }

    /// Upsert.
    fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_none() {
        let kv = SqliteKv::open_in_memory().unwrap();
        assert_eq!(kv.get("scannedMedicines").unwrap(), None);
    }

    #[test]
    fn set_upserts() {
        let kv = SqliteKv::open_in_memory().unwrap();
        kv.set("scannedMedicines", "[]").unwrap();
        kv.set("scannedMedicines", "[{\"id\":1}]").unwrap();
        assert_eq!(
            kv.get("scannedMedicines").unwrap().as_deref(),
            Some("[{\"id\":1}]")
        );
        let rows: i64 = kv
            .connection()
            .query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn migration_idempotent() {
        let kv = SqliteKv::open_in_memory().unwrap();
        assert!(run_migrations(kv.connection()).is_ok());
        assert_eq!(get_current_version(kv.connection()), SCHEMA_VERSION);
    }

    #[test]
    fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("medscan.db");
        SqliteKv::open(&path).unwrap().set("k", "v").unwrap();
        let reopened = SqliteKv::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }
}

//! Local SQLite key-value store for the till.
//!
//! Uses rusqlite with WAL mode. The till keeps only settings and the current
//! shift snapshot here, both in the `local_settings` category/key/value table.

use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{Result, TillError};

/// Database connection shared by the store and settings helpers.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

impl DbState {
    /// Wrap an already configured connection (tests, embedded use).
    pub fn from_connection(conn: Connection, db_path: PathBuf) -> Result<Self> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err("sqlite open"))?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(storage_err("pragma setup"))?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    pub fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TillError::Storage(format!("database lock poisoned: {e}")))
    }
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Initialize the database at `{data_dir}/till.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(data_dir: &Path) -> Result<DbState> {
    fs::create_dir_all(data_dir)
        .map_err(|e| TillError::Storage(format!("Failed to create data dir: {e}")))?;

    let db_path = data_dir.join("till.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                let _ = fs::remove_file(db_path.with_extension("db-wal"));
                let _ = fs::remove_file(db_path.with_extension("db-shm"));
            }
            open_and_configure(&db_path).map_err(|e| {
                TillError::Storage(format!("Database open failed after retry: {e}"))
            })?
        }
    };

    let state = DbState::from_connection(conn, db_path)?;
    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");
    Ok(state)
}

fn open_and_configure(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(storage_err("sqlite open"))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(storage_err("pragma setup"))?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(storage_err("create schema_version"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Migration v1: settings / snapshot table.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS local_settings (
            setting_category TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            UNIQUE(setting_category, setting_key)
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| {
        error!("Migration v1 failed: {e}");
        TillError::Storage(format!("migration v1: {e}"))
    })?;

    info!("Applied migration v1");
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

/// Get a single setting value. A missing row is `Ok(None)`; any other
/// database failure is a storage error.
pub fn read_setting(conn: &Connection, category: &str, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .optional()
    .map_err(storage_err("read_setting"))
}

/// Get a single setting value, logging and ignoring read failures.
pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    read_setting(conn, category, key).unwrap_or_else(|e| {
        warn!(category, key, error = %e, "Failed to read setting");
        None
    })
}

/// Insert or update a setting.
pub fn set_setting(conn: &Connection, category: &str, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )
    .map_err(storage_err("set_setting"))?;
    Ok(())
}

fn storage_err(context: &'static str) -> impl Fn(rusqlite::Error) -> TillError {
    move |e| TillError::Storage(format!("{context}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .expect("pragma setup");
        conn
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = test_db();
        run_migrations(&conn).expect("first run");
        run_migrations(&conn).expect("second run should succeed");

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .expect("read schema version");
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_settings_crud() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        set_setting(&conn, "till", "store_name", "Pho 24").expect("set");
        assert_eq!(
            get_setting(&conn, "till", "store_name"),
            Some("Pho 24".to_string())
        );

        set_setting(&conn, "till", "store_name", "Pho 25").expect("update");
        assert_eq!(
            get_setting(&conn, "till", "store_name"),
            Some("Pho 25".to_string())
        );
        assert!(get_setting(&conn, "other", "store_name").is_none());

        assert_eq!(read_setting(&conn, "other", "store_name"), Ok(None));
    }

    #[test]
    fn test_init_creates_file_db_in_wal_mode() {
        let dir = std::env::temp_dir().join(format!("till_db_test_{}", uuid::Uuid::new_v4()));
        let state = init(&dir).expect("init");
        assert!(state.db_path.ends_with("till.db"));
        {
            let conn = state.lock().expect("lock");
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .expect("read journal_mode");
            assert_eq!(mode.to_lowercase(), "wal");
        }
        drop(state);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_in_memory_state_is_migrated() {
        let state = DbState::open_in_memory().expect("open");
        let conn = state.lock().expect("lock");
        set_setting(&conn, "till", "k", "v").expect("set");
        assert_eq!(get_setting(&conn, "till", "k").as_deref(), Some("v"));
    }

    #[test]
    fn test_read_setting_reports_database_errors() {
        let state = DbState::open_in_memory().expect("open");
        let conn = state.lock().expect("lock");
        set_setting(&conn, "till", "k", "v").expect("set");
        conn.execute_batch("ALTER TABLE local_settings RENAME TO local_settings_old;")
            .expect("rename table");

        assert!(matches!(
            read_setting(&conn, "till", "k"),
            Err(TillError::Storage(_))
        ));
        assert_eq!(get_setting(&conn, "till", "k"), None);
    }
}

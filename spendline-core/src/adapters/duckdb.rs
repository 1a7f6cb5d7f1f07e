//! DuckDB key/value store implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use duckdb::{params, Connection};

use crate::domain::result::{Error, Result};
use crate::migrations::MIGRATIONS;
use crate::ports::KeyValueStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

fn storage_err(e: impl std::fmt::Display) -> Error {
    Error::storage(e.to_string())
}

/// Key/value store persisted in a single DuckDB file
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open (or create) the store at `db_path`.
    ///
    /// Another `sl` process may hold the file briefly, so lock errors are
    /// retried with exponential backoff before giving up.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[spendline] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(storage_err(e));
                }
            }
        }
    }

    /// Non-persistent store backed by an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> std::result::Result<Connection, duckdb::Error> {
        // Extension autoloading is disabled; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::poisoned("database connection"))
    }

    /// Run database migrations, returning what was applied
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn, MIGRATIONS)
            .run_pending()
            .map_err(storage_err)
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Path of the backing file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl KeyValueStore for DuckDbStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT item_value FROM sys_kv_store WHERE item_key = ?")
            .map_err(storage_err)?;
        let mut rows = stmt
            .query_map([key], |row| row.get::<_, String>(0))
            .map_err(storage_err)?;

        let first = rows.next();
        first.transpose().map_err(storage_err)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO sys_kv_store (item_key, item_value, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT (item_key) DO UPDATE SET
                item_value = EXCLUDED.item_value,
                updated_at = EXCLUDED.updated_at",
            params![key, value, now],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM sys_kv_store WHERE item_key = ?", params![key])
            .map_err(storage_err)?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT item_key FROM sys_kv_store ORDER BY item_key")
            .map_err(storage_err)?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(storage_err)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(keys)
    }
}

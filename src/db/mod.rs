use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::config::app_data_dir;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open `data.db` in the app data directory.
    pub fn new() -> Result<Self> {
        Self::open(app_data_dir().join("data.db"))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_tables()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_tables(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS activity_log (
                id          TEXT PRIMARY KEY,
                file_path   TEXT NOT NULL,
                file_name   TEXT NOT NULL,
                action      TEXT NOT NULL,
                rule_name   TEXT,
                destination TEXT,
                timestamp   TEXT NOT NULL,
                result      TEXT NOT NULL,
                details     TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_activity_timestamp ON activity_log(timestamp);
            ",
        )?;
        Ok(())
    }
}

// ── Sub-modules ─────────────────────────────────────────────

mod activity;
mod models;

// ── Re-exports ──────────────────────────────────────────────

pub use models::{ActivityLogEntry, NewActivity};

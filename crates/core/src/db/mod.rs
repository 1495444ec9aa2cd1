//! Persisted state: a single SQLite connection shared by every store, with
//! a versioned migration runner (spec component N).
//!
//! The pipeline's concurrency model (spec §5) requires all writes to go
//! through one connection or a serialized pool to avoid write-write
//! conflicts; this module is that connection, wrapped so every store in
//! `indexer::sqlite`, `decision::sqlite`, and the CLI's `settings` lookup
//! shares it rather than opening their own.

mod settings;

pub use settings::SettingsStore;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Shared handle to the process's one SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const CURRENT_SCHEMA_VERSION: i64 = 1;

impl Database {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Database { conn: Arc::new(Mutex::new(conn)) };
        db.migrate()?;
        Ok(db)
    }

    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T, DbError>) -> Result<T, DbError> {
        let conn = self.conn.lock().expect("sqlite connection mutex poisoned");
        f(&conn)
    }

    fn migrate(&self) -> Result<(), DbError> {
        self.with_connection(|conn| {
            let user_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
            if user_version < 1 {
                apply_v1(conn)?;
            }
            conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
            Ok(())
        })
    }
}

fn apply_v1(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS indexer (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            url             TEXT NOT NULL UNIQUE,
            apikey          TEXT NOT NULL,
            name            TEXT,
            active          INTEGER NOT NULL DEFAULT 1,
            status          TEXT NOT NULL DEFAULT 'OK',
            retry_after     TEXT,
            status_count    INTEGER NOT NULL DEFAULT 0,
            caps_search     INTEGER NOT NULL DEFAULT 0,
            caps_tv         INTEGER NOT NULL DEFAULT 0,
            caps_movie      INTEGER NOT NULL DEFAULT 0,
            caps_music      INTEGER NOT NULL DEFAULT 0,
            caps_audio      INTEGER NOT NULL DEFAULT 0,
            caps_book       INTEGER NOT NULL DEFAULT 0,
            id_caps         TEXT NOT NULL DEFAULT '',
            cat_caps        TEXT NOT NULL DEFAULT '',
            limits_max      INTEGER NOT NULL DEFAULT 100,
            limits_default  INTEGER NOT NULL DEFAULT 50
        );

        CREATE TABLE IF NOT EXISTS decision (
            searchee_name     TEXT NOT NULL,
            candidate_guid    TEXT NOT NULL,
            indexer_id        INTEGER NOT NULL,
            verdict           TEXT NOT NULL,
            info_hash         TEXT,
            first_seen        TEXT NOT NULL,
            last_seen         TEXT NOT NULL,
            fuzzy_size_factor REAL,
            PRIMARY KEY (searchee_name, candidate_guid)
        );

        CREATE TABLE IF NOT EXISTS timestamp (
            searchee_name  TEXT NOT NULL,
            indexer_id     INTEGER NOT NULL,
            first_searched TEXT NOT NULL,
            last_searched  TEXT NOT NULL,
            PRIMARY KEY (searchee_name, indexer_id)
        );

        CREATE TABLE IF NOT EXISTS searchee (
            name       TEXT PRIMARY KEY,
            first_seen TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS settings (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS rss_cursor (
            indexer_id    INTEGER PRIMARY KEY,
            last_pub_date TEXT,
            seen_guids    TEXT NOT NULL DEFAULT ''
        );
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_fresh_database_to_current_version() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
            assert_eq!(version, CURRENT_SCHEMA_VERSION);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn migration_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.migrate().unwrap();
    }
}

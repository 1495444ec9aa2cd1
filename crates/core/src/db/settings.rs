use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{Database, DbError};

const API_KEY_SETTING: &str = "api_key";

/// Thin key-value accessor over the `settings` table (spec §6 "Persisted
/// state"), used by the `api-key`/`reset-api-key` CLI commands and the
/// admin API's bearer-auth setup.
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        SettingsStore { db }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        self.db.with_connection(|conn| {
            conn.query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
                .optional()
                .map_err(DbError::from)
        })
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    /// Returns the persisted API key, generating and storing a fresh one on
    /// first use (`gen-config`/first `daemon` start).
    pub fn get_or_create_api_key(&self) -> Result<String, DbError> {
        if let Some(key) = self.get(API_KEY_SETTING)? {
            return Ok(key);
        }
        let key = Uuid::new_v4().simple().to_string();
        self.set(API_KEY_SETTING, &key)?;
        Ok(key)
    }

    /// `reset-api-key`: generates and persists a new key, invalidating the
    /// old one.
    pub fn reset_api_key(&self) -> Result<String, DbError> {
        let key = Uuid::new_v4().simple().to_string();
        self.set(API_KEY_SETTING, &key)?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_and_persists_api_key_on_first_use() {
        let store = SettingsStore::new(Database::open_in_memory().unwrap());
        let key = store.get_or_create_api_key().unwrap();
        assert!(!key.is_empty());
        assert_eq!(store.get_or_create_api_key().unwrap(), key);
    }

    #[test]
    fn reset_api_key_changes_the_value() {
        let store = SettingsStore::new(Database::open_in_memory().unwrap());
        let first = store.get_or_create_api_key().unwrap();
        let second = store.reset_api_key().unwrap();
        assert_ne!(first, second);
        assert_eq!(store.get("api_key").unwrap(), Some(second));
    }

    #[test]
    fn arbitrary_key_roundtrips() {
        let store = SettingsStore::new(Database::open_in_memory().unwrap());
        store.set("foo", "bar").unwrap();
        assert_eq!(store.get("foo").unwrap(), Some("bar".to_string()));
        store.set("foo", "baz").unwrap();
        assert_eq!(store.get("foo").unwrap(), Some("baz".to_string()));
    }
}

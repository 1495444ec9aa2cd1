use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::collections::HashSet;

use crate::db::{Database, DbError};

/// Per-indexer RSS scan position: the newest `pubDate` seen, plus the set
/// of guids seen at that exact timestamp (pubDate alone does not
/// disambiguate items published in the same second). The RSS scan stops
/// once it reaches an item the cursor already covers (spec §4.H).
#[derive(Debug, Clone, Default)]
pub struct RssCursor {
    pub last_pub_date: Option<DateTime<Utc>>,
    pub seen_guids: HashSet<String>,
}

impl RssCursor {
    pub fn covers(&self, pub_date: Option<DateTime<Utc>>, guid: &str) -> bool {
        match (self.last_pub_date, pub_date) {
            (Some(cursor), Some(item)) if item < cursor => true,
            (Some(cursor), Some(item)) if item == cursor => self.seen_guids.contains(guid),
            _ => false,
        }
    }
}

pub struct RssCursorStore {
    db: Database,
}

impl RssCursorStore {
    pub fn new(db: Database) -> Self {
        RssCursorStore { db }
    }

    pub async fn get(&self, indexer_id: i64) -> Result<RssCursor, DbError> {
        self.db.with_connection(|conn| {
            let row: Option<(Option<String>, String)> = conn
                .query_row(
                    "SELECT last_pub_date, seen_guids FROM rss_cursor WHERE indexer_id = ?1",
                    params![indexer_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            Ok(match row {
                None => RssCursor::default(),
                Some((last_pub_date, seen_guids)) => RssCursor {
                    last_pub_date: last_pub_date
                        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                        .map(|d| d.with_timezone(&Utc)),
                    seen_guids: seen_guids.split(',').filter(|s| !s.is_empty()).map(String::from).collect(),
                },
            })
        })
    }

    /// Advances the cursor to `pub_date`/`guid` if it is newer than what's
    /// stored, otherwise adds `guid` to the same-timestamp seen set.
    pub async fn advance(&self, indexer_id: i64, pub_date: Option<DateTime<Utc>>, guid: &str) -> Result<(), DbError> {
        let mut cursor = self.get(indexer_id).await?;

        match (cursor.last_pub_date, pub_date) {
            (Some(existing), Some(new)) if new > existing => {
                cursor.last_pub_date = Some(new);
                cursor.seen_guids = HashSet::from([guid.to_string()]);
            }
            (Some(existing), Some(new)) if new == existing => {
                cursor.seen_guids.insert(guid.to_string());
            }
            (None, Some(new)) => {
                cursor.last_pub_date = Some(new);
                cursor.seen_guids = HashSet::from([guid.to_string()]);
            }
            _ => return Ok(()),
        }

        let seen_guids = cursor.seen_guids.iter().cloned().collect::<Vec<_>>().join(",");
        let last_pub_date = cursor.last_pub_date.map(|d| d.to_rfc3339());

        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO rss_cursor (indexer_id, last_pub_date, seen_guids) VALUES (?1, ?2, ?3)
                 ON CONFLICT(indexer_id) DO UPDATE SET last_pub_date = excluded.last_pub_date, seen_guids = excluded.seen_guids",
                params![indexer_id, last_pub_date, seen_guids],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RssCursorStore {
        RssCursorStore::new(Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn fresh_cursor_covers_nothing() {
        let store = store();
        let cursor = store.get(1).await.unwrap();
        assert!(!cursor.covers(Some(Utc::now()), "guid-1"));
    }

    #[tokio::test]
    async fn advancing_moves_the_cursor_forward() {
        let store = store();
        let now = Utc::now();
        store.advance(1, Some(now), "guid-1").await.unwrap();

        let cursor = store.get(1).await.unwrap();
        assert_eq!(cursor.last_pub_date, Some(now));
        assert!(cursor.covers(Some(now), "guid-1"));
        assert!(!cursor.covers(Some(now), "guid-2"));
    }

    #[tokio::test]
    async fn older_items_do_not_move_the_cursor_back() {
        let store = store();
        let later = Utc::now();
        let earlier = later - chrono::Duration::seconds(60);

        store.advance(1, Some(later), "guid-new").await.unwrap();
        store.advance(1, Some(earlier), "guid-old").await.unwrap();

        let cursor = store.get(1).await.unwrap();
        assert_eq!(cursor.last_pub_date, Some(later));
        assert!(cursor.covers(Some(earlier), "guid-old"));
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::Database;

use super::store::{IndexerError, IndexerStore};
use super::types::{backoff_duration, Indexer, IndexerCaps, IndexerOutcome, IndexerStatus, NewIndexer};

pub struct SqliteIndexerStore {
    db: Database,
}

impl SqliteIndexerStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn row_to_indexer(row: &Row) -> rusqlite::Result<Indexer> {
    let id_caps: String = row.get("id_caps")?;
    let cat_caps: String = row.get("cat_caps")?;
    let retry_after: Option<String> = row.get("retry_after")?;
    let status: String = row.get("status")?;

    Ok(Indexer {
        id: row.get("id")?,
        url: row.get("url")?,
        apikey: row.get("apikey")?,
        name: row.get("name")?,
        active: row.get::<_, i64>("active")? != 0,
        status: IndexerStatus::parse(&status),
        retry_after: retry_after.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
        status_count: row.get::<_, i64>("status_count")? as u32,
        caps: IndexerCaps {
            search: row.get::<_, i64>("caps_search")? != 0,
            tv: row.get::<_, i64>("caps_tv")? != 0,
            movie: row.get::<_, i64>("caps_movie")? != 0,
            music: row.get::<_, i64>("caps_music")? != 0,
            audio: row.get::<_, i64>("caps_audio")? != 0,
            book: row.get::<_, i64>("caps_book")? != 0,
            id_caps: split_csv(&id_caps),
            cat_caps: split_csv(&cat_caps),
            limits_max: row.get::<_, i64>("limits_max")? as u32,
            limits_default: row.get::<_, i64>("limits_default")? as u32,
        },
    })
}

fn split_csv(s: &str) -> Vec<String> {
    if s.is_empty() {
        Vec::new()
    } else {
        s.split(',').map(|x| x.to_string()).collect()
    }
}

const SELECT_COLUMNS: &str = "id, url, apikey, name, active, status, retry_after, status_count, \
    caps_search, caps_tv, caps_movie, caps_music, caps_audio, caps_book, id_caps, cat_caps, \
    limits_max, limits_default";

#[async_trait]
impl IndexerStore for SqliteIndexerStore {
    async fn list_active(&self) -> Result<Vec<Indexer>, IndexerError> {
        self.db
            .with_connection(|conn| {
                let sql = format!("SELECT {} FROM indexer WHERE active = 1", SELECT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], row_to_indexer)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .map_err(IndexerError::from)
    }

    async fn list_all(&self) -> Result<Vec<Indexer>, IndexerError> {
        self.db
            .with_connection(|conn| {
                let sql = format!("SELECT {} FROM indexer", SELECT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], row_to_indexer)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .map_err(IndexerError::from)
    }

    async fn get(&self, id: i64) -> Result<Option<Indexer>, IndexerError> {
        self.db
            .with_connection(|conn| {
                let sql = format!("SELECT {} FROM indexer WHERE id = ?1", SELECT_COLUMNS);
                conn.query_row(&sql, params![id], row_to_indexer).optional().map_err(Into::into)
            })
            .map_err(IndexerError::from)
    }

    async fn upsert(&self, new: NewIndexer) -> Result<Indexer, IndexerError> {
        let id = self
            .db
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO indexer (url, apikey, name, active) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(url) DO UPDATE SET apikey = excluded.apikey, name = excluded.name, active = excluded.active",
                    params![new.url, new.apikey, new.name, new.active as i64],
                )?;
                conn.query_row("SELECT id FROM indexer WHERE url = ?1", params![new.url], |r| r.get(0))
            })
            .map_err(IndexerError::from)?;

        self.get(id).await?.ok_or(IndexerError::NotFound(id))
    }

    async fn mark_result(&self, id: i64, outcome: IndexerOutcome) -> Result<(), IndexerError> {
        let now = Utc::now();
        self.db
            .with_connection(|conn| {
                match outcome {
                    IndexerOutcome::Success => {
                        conn.execute(
                            "UPDATE indexer SET status = 'OK', retry_after = NULL, status_count = 0 WHERE id = ?1",
                            params![id],
                        )?;
                    }
                    IndexerOutcome::RateLimited => {
                        let status_count: i64 = conn.query_row(
                            "SELECT status_count FROM indexer WHERE id = ?1",
                            params![id],
                            |r| r.get(0),
                        )?;
                        let new_count = status_count + 1;
                        let retry_after = now + backoff_duration(new_count as u32);
                        conn.execute(
                            "UPDATE indexer SET status = 'RATE_LIMITED', retry_after = ?2, status_count = ?3 WHERE id = ?1",
                            params![id, retry_after.to_rfc3339(), new_count],
                        )?;
                    }
                    IndexerOutcome::AuthFailed => {
                        conn.execute(
                            "UPDATE indexer SET status = 'INVALID_AUTH', retry_after = NULL WHERE id = ?1",
                            params![id],
                        )?;
                    }
                    IndexerOutcome::Transient => {
                        conn.execute(
                            "UPDATE indexer SET status = 'UNKNOWN_ERROR' WHERE id = ?1",
                            params![id],
                        )?;
                    }
                }
                Ok(())
            })
            .map_err(IndexerError::from)
    }

    async fn clear_failures(&self) -> Result<(), IndexerError> {
        self.db
            .with_connection(|conn| {
                conn.execute(
                    "UPDATE indexer SET status = 'OK', retry_after = NULL, status_count = 0",
                    [],
                )?;
                Ok(())
            })
            .map_err(IndexerError::from)
    }

    async fn update_caps(&self, id: i64, caps: IndexerCaps) -> Result<(), IndexerError> {
        self.db
            .with_connection(|conn| {
                conn.execute(
                    "UPDATE indexer SET caps_search = ?2, caps_tv = ?3, caps_movie = ?4, \
                     caps_music = ?5, caps_audio = ?6, caps_book = ?7, id_caps = ?8, cat_caps = ?9, \
                     limits_max = ?10, limits_default = ?11 WHERE id = ?1",
                    params![
                        id,
                        caps.search as i64,
                        caps.tv as i64,
                        caps.movie as i64,
                        caps.music as i64,
                        caps.audio as i64,
                        caps.book as i64,
                        caps.id_caps.join(","),
                        caps.cat_caps.join(","),
                        caps.limits_max,
                        caps.limits_default,
                    ],
                )?;
                Ok(())
            })
            .map_err(IndexerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteIndexerStore {
        SqliteIndexerStore::new(Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn upsert_then_list_active() {
        let store = store();
        store
            .upsert(NewIndexer { url: "https://a.test".into(), apikey: "k".into(), name: Some("A".into()), active: true })
            .await
            .unwrap();
        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status, IndexerStatus::Ok);
    }

    #[tokio::test]
    async fn rate_limit_sets_increasing_cooldown() {
        let store = store();
        let indexer = store
            .upsert(NewIndexer { url: "https://a.test".into(), apikey: "k".into(), name: None, active: true })
            .await
            .unwrap();

        store.mark_result(indexer.id, IndexerOutcome::RateLimited).await.unwrap();
        let first = store.get(indexer.id).await.unwrap().unwrap();
        assert_eq!(first.status, IndexerStatus::RateLimited);
        assert_eq!(first.status_count, 1);

        store.mark_result(indexer.id, IndexerOutcome::RateLimited).await.unwrap();
        let second = store.get(indexer.id).await.unwrap().unwrap();
        assert_eq!(second.status_count, 2);
        assert!(second.retry_after.unwrap() > first.retry_after.unwrap());
    }

    #[tokio::test]
    async fn clear_failures_resets_all_rows() {
        let store = store();
        let indexer = store
            .upsert(NewIndexer { url: "https://a.test".into(), apikey: "k".into(), name: None, active: true })
            .await
            .unwrap();
        store.mark_result(indexer.id, IndexerOutcome::RateLimited).await.unwrap();
        store.clear_failures().await.unwrap();
        let cleared = store.get(indexer.id).await.unwrap().unwrap();
        assert_eq!(cleared.status, IndexerStatus::Ok);
        assert!(cleared.retry_after.is_none());
    }

    #[tokio::test]
    async fn success_resets_status_count() {
        let store = store();
        let indexer = store
            .upsert(NewIndexer { url: "https://a.test".into(), apikey: "k".into(), name: None, active: true })
            .await
            .unwrap();
        store.mark_result(indexer.id, IndexerOutcome::RateLimited).await.unwrap();
        store.mark_result(indexer.id, IndexerOutcome::Success).await.unwrap();
        let reset = store.get(indexer.id).await.unwrap().unwrap();
        assert_eq!(reset.status_count, 0);
        assert_eq!(reset.status, IndexerStatus::Ok);
    }

    #[tokio::test]
    async fn update_caps_persists_and_reloads() {
        let store = store();
        let indexer = store
            .upsert(NewIndexer { url: "https://a.test".into(), apikey: "k".into(), name: None, active: true })
            .await
            .unwrap();
        assert!(!indexer.caps.search);

        let caps = IndexerCaps {
            search: true,
            tv: true,
            movie: false,
            music: false,
            audio: false,
            book: false,
            id_caps: vec!["tvdbid".into(), "rid".into()],
            cat_caps: vec!["5000".into(), "5040".into()],
            limits_max: 100,
            limits_default: 50,
        };
        store.update_caps(indexer.id, caps).await.unwrap();

        let reloaded = store.get(indexer.id).await.unwrap().unwrap();
        assert!(reloaded.caps.search);
        assert!(reloaded.caps.tv);
        assert!(!reloaded.caps.movie);
        assert_eq!(reloaded.caps.id_caps, vec!["tvdbid", "rid"]);
        assert_eq!(reloaded.caps.cat_caps, vec!["5000", "5040"]);
        assert_eq!(reloaded.caps.limits_max, 100);
    }
}

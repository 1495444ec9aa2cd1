use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::Database;

use super::store::{DecisionError, DecisionStore};
use super::types::{Decision, NewDecision, Verdict};

pub struct SqliteDecisionStore {
    db: Database,
}

impl SqliteDecisionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl DecisionStore for SqliteDecisionStore {
    async fn record(&self, decision: NewDecision) -> Result<Decision, DecisionError> {
        self.db
            .with_connection(|conn| {
                let now = Utc::now();
                let existing: Option<(String, String)> = conn
                    .query_row(
                        "SELECT verdict, first_seen FROM decision WHERE searchee_name = ?1 AND candidate_guid = ?2",
                        params![decision.searchee_name, decision.candidate_guid],
                        |r| Ok((r.get(0)?, r.get(1)?)),
                    )
                    .optional()?;

                let (verdict, first_seen) = match existing {
                    Some((existing_verdict, first_seen)) => {
                        let existing = Verdict::parse(&existing_verdict);
                        if existing.is_match_family() {
                            (existing, first_seen)
                        } else {
                            (decision.verdict, first_seen)
                        }
                    }
                    None => (decision.verdict, now.to_rfc3339()),
                };

                conn.execute(
                    "INSERT INTO decision (searchee_name, candidate_guid, indexer_id, verdict, info_hash, first_seen, last_seen, fuzzy_size_factor)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(searchee_name, candidate_guid) DO UPDATE SET
                        verdict = excluded.verdict,
                        indexer_id = excluded.indexer_id,
                        info_hash = excluded.info_hash,
                        last_seen = excluded.last_seen,
                        fuzzy_size_factor = excluded.fuzzy_size_factor",
                    params![
                        decision.searchee_name,
                        decision.candidate_guid,
                        decision.indexer_id,
                        verdict.as_str(),
                        decision.info_hash,
                        first_seen,
                        now.to_rfc3339(),
                        decision.fuzzy_size_factor,
                    ],
                )?;

                Ok(Decision {
                    searchee_name: decision.searchee_name,
                    candidate_guid: decision.candidate_guid,
                    indexer_id: decision.indexer_id,
                    verdict,
                    info_hash: decision.info_hash,
                    first_seen: parse_rfc3339(&first_seen),
                    last_seen: now,
                    fuzzy_size_factor: decision.fuzzy_size_factor,
                })
            })
            .map_err(DecisionError::from)
    }

    async fn has_decision(&self, searchee_name: &str, candidate_guid: &str) -> Result<Option<Verdict>, DecisionError> {
        self.db
            .with_connection(|conn| {
                let verdict: Option<String> = conn
                    .query_row(
                        "SELECT verdict FROM decision WHERE searchee_name = ?1 AND candidate_guid = ?2",
                        params![searchee_name, candidate_guid],
                        |r| r.get(0),
                    )
                    .optional()?;
                Ok(verdict.map(|v| Verdict::parse(&v)))
            })
            .map_err(DecisionError::from)
    }

    async fn clear_cache(&self) -> Result<u64, DecisionError> {
        self.db
            .with_connection(|conn| {
                let n = conn.execute("DELETE FROM decision WHERE info_hash IS NULL", [])?;
                Ok(n as u64)
            })
            .map_err(DecisionError::from)
    }

    async fn record_timestamp(&self, searchee_name: &str, indexer_id: i64) -> Result<(), DecisionError> {
        self.db
            .with_connection(|conn| {
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO timestamp (searchee_name, indexer_id, first_searched, last_searched)
                     VALUES (?1, ?2, ?3, ?3)
                     ON CONFLICT(searchee_name, indexer_id) DO UPDATE SET last_searched = excluded.last_searched",
                    params![searchee_name, indexer_id, now],
                )?;
                Ok(())
            })
            .map_err(DecisionError::from)
    }

    async fn last_searched(&self, searchee_name: &str, indexer_id: i64) -> Result<Option<DateTime<Utc>>, DecisionError> {
        self.db
            .with_connection(|conn| {
                let v: Option<String> = conn
                    .query_row(
                        "SELECT last_searched FROM timestamp WHERE searchee_name = ?1 AND indexer_id = ?2",
                        params![searchee_name, indexer_id],
                        |r| r.get(0),
                    )
                    .optional()?;
                Ok(v.map(|s| parse_rfc3339(&s)))
            })
            .map_err(DecisionError::from)
    }

    async fn first_searched(&self, searchee_name: &str, indexer_id: i64) -> Result<Option<DateTime<Utc>>, DecisionError> {
        self.db
            .with_connection(|conn| {
                let v: Option<String> = conn
                    .query_row(
                        "SELECT first_searched FROM timestamp WHERE searchee_name = ?1 AND indexer_id = ?2",
                        params![searchee_name, indexer_id],
                        |r| r.get(0),
                    )
                    .optional()?;
                Ok(v.map(|s| parse_rfc3339(&s)))
            })
            .map_err(DecisionError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteDecisionStore {
        SqliteDecisionStore::new(Database::open_in_memory().unwrap())
    }

    fn decision(verdict: Verdict) -> NewDecision {
        NewDecision {
            searchee_name: "Show.S01E01".into(),
            candidate_guid: "guid-1".into(),
            indexer_id: 1,
            verdict,
            info_hash: None,
            fuzzy_size_factor: None,
        }
    }

    #[tokio::test]
    async fn record_is_idempotent_and_preserves_first_seen() {
        let store = store();
        let first = store.record(decision(Verdict::SizeMismatch)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.record(decision(Verdict::SizeMismatch)).await.unwrap();
        assert_eq!(first.first_seen, second.first_seen);
        assert!(second.last_seen >= first.last_seen);
    }

    #[tokio::test]
    async fn match_verdict_is_never_downgraded() {
        let store = store();
        store.record(decision(Verdict::Match)).await.unwrap();
        let attempt = store.record(decision(Verdict::SizeMismatch)).await.unwrap();
        assert_eq!(attempt.verdict, Verdict::Match);
    }

    #[tokio::test]
    async fn has_decision_reflects_stored_verdict() {
        let store = store();
        assert!(store.has_decision("Show.S01E01", "guid-1").await.unwrap().is_none());
        store.record(decision(Verdict::Match)).await.unwrap();
        assert_eq!(store.has_decision("Show.S01E01", "guid-1").await.unwrap(), Some(Verdict::Match));
    }

    #[tokio::test]
    async fn clear_cache_only_removes_non_downloaded_decisions() {
        let store = store();
        let mut matched = decision(Verdict::Match);
        matched.info_hash = Some("abc123".into());
        store.record(matched).await.unwrap();

        let mut other = decision(Verdict::SizeMismatch);
        other.candidate_guid = "guid-2".into();
        store.record(other).await.unwrap();

        let removed = store.clear_cache().await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.has_decision("Show.S01E01", "guid-1").await.unwrap(), Some(Verdict::Match));
        assert!(store.has_decision("Show.S01E01", "guid-2").await.unwrap().is_none());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health status of an indexer, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexerStatus {
    Ok,
    UnknownError,
    RateLimited,
    InvalidAuth,
}

impl IndexerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexerStatus::Ok => "OK",
            IndexerStatus::UnknownError => "UNKNOWN_ERROR",
            IndexerStatus::RateLimited => "RATE_LIMITED",
            IndexerStatus::InvalidAuth => "INVALID_AUTH",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "RATE_LIMITED" => IndexerStatus::RateLimited,
            "INVALID_AUTH" => IndexerStatus::InvalidAuth,
            "OK" => IndexerStatus::Ok,
            _ => IndexerStatus::UnknownError,
        }
    }
}

/// Capabilities an indexer advertises via its Torznab `caps` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexerCaps {
    pub search: bool,
    pub tv: bool,
    pub movie: bool,
    pub music: bool,
    pub audio: bool,
    pub book: bool,
    pub id_caps: Vec<String>,
    pub cat_caps: Vec<String>,
    pub limits_max: u32,
    pub limits_default: u32,
}

/// A registered Torznab endpoint (spec §3 "Indexer").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indexer {
    pub id: i64,
    pub url: String,
    pub apikey: String,
    pub name: Option<String>,
    pub active: bool,
    pub status: IndexerStatus,
    pub retry_after: Option<DateTime<Utc>>,
    pub status_count: u32,
    pub caps: IndexerCaps,
}

impl Indexer {
    /// While `retry_after` is set and in the future, the indexer is skipped
    /// by query planning but remains enumerable (spec §3 invariant).
    pub fn is_on_cooldown(&self, now: DateTime<Utc>) -> bool {
        matches!(self.retry_after, Some(t) if t > now)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// A new indexer registration before an id has been assigned.
#[derive(Debug, Clone)]
pub struct NewIndexer {
    pub url: String,
    pub apikey: String,
    pub name: Option<String>,
    pub active: bool,
}

/// The outcome of a single request against an indexer, used to update its
/// health and cooldown state (spec §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerOutcome {
    Success,
    RateLimited,
    AuthFailed,
    Transient,
}

/// The exponential backoff ladder for rate-limit cooldowns, per spec §4.C
/// design default: 1 min, 5 min, 15 min, 1 h, then 1 h repeating.
pub fn backoff_duration(status_count: u32) -> chrono::Duration {
    const STEPS_SECS: [i64; 4] = [60, 300, 900, 3600];
    let idx = status_count.saturating_sub(1).min(STEPS_SECS.len() as u32 - 1) as usize;
    chrono::Duration::seconds(STEPS_SECS[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_ladder_caps_at_one_hour() {
        assert_eq!(backoff_duration(1), chrono::Duration::seconds(60));
        assert_eq!(backoff_duration(2), chrono::Duration::seconds(300));
        assert_eq!(backoff_duration(3), chrono::Duration::seconds(900));
        assert_eq!(backoff_duration(4), chrono::Duration::seconds(3600));
        assert_eq!(backoff_duration(10), chrono::Duration::seconds(3600));
    }

    #[test]
    fn cooldown_expires_in_the_past() {
        let indexer = Indexer {
            id: 1,
            url: "https://example.test".into(),
            apikey: "key".into(),
            name: None,
            active: true,
            status: IndexerStatus::RateLimited,
            retry_after: Some(Utc::now() - chrono::Duration::seconds(5)),
            status_count: 1,
            caps: IndexerCaps::default(),
        };
        assert!(!indexer.is_on_cooldown(Utc::now()));
    }
}

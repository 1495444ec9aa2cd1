use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Match/reject outcome for a (searchee, candidate) pair, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Match,
    MatchSizeOnly,
    MatchPartial,
    RateLimited,
    InfoHashAlreadyExists,
    FileTreeMismatch,
    SizeMismatch,
    NoDownloadLink,
    BlockedRelease,
    UnknownError,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Match => "MATCH",
            Verdict::MatchSizeOnly => "MATCH_SIZE_ONLY",
            Verdict::MatchPartial => "MATCH_PARTIAL",
            Verdict::RateLimited => "RATE_LIMITED",
            Verdict::InfoHashAlreadyExists => "INFO_HASH_ALREADY_EXISTS",
            Verdict::FileTreeMismatch => "FILE_TREE_MISMATCH",
            Verdict::SizeMismatch => "SIZE_MISMATCH",
            Verdict::NoDownloadLink => "NO_DOWNLOAD_LINK",
            Verdict::BlockedRelease => "BLOCKED_RELEASE",
            Verdict::UnknownError => "UNKNOWN_ERROR",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "MATCH" => Verdict::Match,
            "MATCH_SIZE_ONLY" => Verdict::MatchSizeOnly,
            "MATCH_PARTIAL" => Verdict::MatchPartial,
            "RATE_LIMITED" => Verdict::RateLimited,
            "INFO_HASH_ALREADY_EXISTS" => Verdict::InfoHashAlreadyExists,
            "FILE_TREE_MISMATCH" => Verdict::FileTreeMismatch,
            "SIZE_MISMATCH" => Verdict::SizeMismatch,
            "NO_DOWNLOAD_LINK" => Verdict::NoDownloadLink,
            "BLOCKED_RELEASE" => Verdict::BlockedRelease,
            _ => Verdict::UnknownError,
        }
    }

    /// MATCH-family verdicts are terminal: never downgraded by a later
    /// pass (spec §3 invariant, §8 invariant 4).
    pub fn is_match_family(&self) -> bool {
        matches!(self, Verdict::Match | Verdict::MatchSizeOnly | Verdict::MatchPartial)
    }

    /// Whether a post-injection recheck is warranted, per spec §4.F.
    pub fn requires_recheck(&self) -> bool {
        matches!(self, Verdict::MatchPartial)
    }
}

/// A row to be recorded (or updated) in the decision cache.
#[derive(Debug, Clone)]
pub struct NewDecision {
    pub searchee_name: String,
    pub candidate_guid: String,
    pub indexer_id: i64,
    pub verdict: Verdict,
    pub info_hash: Option<String>,
    pub fuzzy_size_factor: Option<f64>,
}

/// A persisted decision row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub searchee_name: String,
    pub candidate_guid: String,
    pub indexer_id: i64,
    pub verdict: Verdict,
    pub info_hash: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub fuzzy_size_factor: Option<f64>,
}

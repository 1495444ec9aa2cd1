use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::searchee::{ExtensionPolicy, SearcheeFile};

/// Strictness level for file-tree equivalence, strict to lenient (spec §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Safe,
    Risky,
    Partial,
}

impl Default for MatchMode {
    fn default() -> Self {
        MatchMode::Safe
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchMode::Safe => "safe",
            MatchMode::Risky => "risky",
            MatchMode::Partial => "partial",
        })
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "safe" => Ok(MatchMode::Safe),
            "risky" => Ok(MatchMode::Risky),
            "partial" => Ok(MatchMode::Partial),
            other => Err(format!("unknown match mode `{}`", other)),
        }
    }
}

/// A candidate torrent as known to the matcher. Pre-snatch, only `title`,
/// `total_size`, and (when the indexer advertises it) `info_hash` are
/// known; `files` is populated once the candidate has been snatched and
/// the metafile parsed (spec §4.H step iv).
#[derive(Debug, Clone)]
pub struct CandidateMeta {
    pub title: String,
    pub info_hash: Option<String>,
    pub total_size: u64,
    pub files: Vec<SearcheeFile>,
}

/// Runtime matcher policy (spec §4.F).
#[derive(Debug, Clone)]
pub struct MatchPolicy {
    pub mode: MatchMode,
    pub fuzzy_size_threshold: f64,
    pub block_list: Vec<String>,
    pub extensions: ExtensionPolicy,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy {
            mode: MatchMode::Safe,
            fuzzy_size_threshold: 0.02,
            block_list: Vec::new(),
            extensions: ExtensionPolicy::default(),
        }
    }
}

impl MatchPolicy {
    pub fn is_blocked(&self, title: &str, info_hash: Option<&str>) -> bool {
        self.block_list.iter().any(|b| {
            title.eq_ignore_ascii_case(b) || info_hash.is_some_and(|h| h.eq_ignore_ascii_case(b))
        })
    }

    pub fn sizes_within_tolerance(&self, a: u64, b: u64) -> bool {
        if a == b {
            return true;
        }
        let (a, b) = (a as f64, b as f64);
        let larger = a.max(b);
        if larger == 0.0 {
            return true;
        }
        (a - b).abs() / larger <= self.fuzzy_size_threshold
    }
}

/// A set of infohashes already present in the active client, used to reject
/// candidates that would duplicate an existing download (spec §4.F check 1).
pub type KnownInfoHashes = HashSet<String>;

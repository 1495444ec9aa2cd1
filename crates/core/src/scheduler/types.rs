use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which periodic loop a [`JobState`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobName {
    Search,
    Rss,
}

impl JobName {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobName::Search => "SEARCH",
            JobName::Rss => "RSS",
        }
    }
}

/// Observable state of one scheduler loop. `running` is true for at most
/// one holder per job name across the process.
#[derive(Debug, Clone, Serialize)]
pub struct JobState {
    pub name: JobName,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub running: bool,
}

impl JobState {
    pub fn idle(name: JobName) -> Self {
        JobState { name, last_run: None, next_run: None, running: false }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One file belonging to a searchee, relative to the searchee's logical root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearcheeFile {
    pub relative_path: String,
    pub size: u64,
}

/// Where a searchee's data came from (spec §3 "Searchee").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum SearcheeOrigin {
    /// Parsed directly from a `.torrent` file found in `torrentDir`.
    Torrent { info_hash: String },
    /// Reported by the active torrent client adapter.
    Client { info_hash: String, completed: bool, save_path: String },
    /// A directory of data files with no associated `.torrent`.
    Data { root: PathBuf },
}

impl SearcheeOrigin {
    pub fn info_hash(&self) -> Option<&str> {
        match self {
            SearcheeOrigin::Torrent { info_hash } | SearcheeOrigin::Client { info_hash, .. } => {
                Some(info_hash)
            }
            SearcheeOrigin::Data { .. } => None,
        }
    }
}

/// A uniform view over "something we want to cross-seed" (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Searchee {
    pub name: String,
    pub files: Vec<SearcheeFile>,
    pub total_size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub origin: SearcheeOrigin,
}

#[derive(Debug)]
pub enum SearcheeError {
    EmptyFileList,
    PathEscapesRoot(String),
}

impl fmt::Display for SearcheeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearcheeError::EmptyFileList => write!(f, "searchee has no files"),
            SearcheeError::PathEscapesRoot(p) => write!(f, "path `{}` escapes the searchee root", p),
        }
    }
}

impl std::error::Error for SearcheeError {}

impl Searchee {
    pub fn new(
        name: impl Into<String>,
        files: Vec<SearcheeFile>,
        created_at: Option<DateTime<Utc>>,
        origin: SearcheeOrigin,
    ) -> Result<Self, SearcheeError> {
        if files.is_empty() {
            return Err(SearcheeError::EmptyFileList);
        }
        for f in &files {
            if is_path_escaping(&f.relative_path) {
                return Err(SearcheeError::PathEscapesRoot(f.relative_path.clone()));
            }
        }
        let total_size = files.iter().map(|f| f.size).sum();
        Ok(Searchee { name: name.into(), files, total_size, created_at, origin })
    }

    pub fn info_hash(&self) -> Option<&str> {
        self.origin.info_hash()
    }

    pub fn is_data_origin(&self) -> bool {
        matches!(self.origin, SearcheeOrigin::Data { .. })
    }
}

fn is_path_escaping(path: &str) -> bool {
    path.split('/').any(|seg| seg == "..") || path.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_file_list() {
        let err = Searchee::new("x", vec![], None, SearcheeOrigin::Data { root: "/tmp".into() })
            .unwrap_err();
        assert!(matches!(err, SearcheeError::EmptyFileList));
    }

    #[test]
    fn rejects_path_traversal() {
        let files = vec![SearcheeFile { relative_path: "../etc/passwd".into(), size: 1 }];
        let err = Searchee::new("x", files, None, SearcheeOrigin::Data { root: "/tmp".into() })
            .unwrap_err();
        assert!(matches!(err, SearcheeError::PathEscapesRoot(_)));
    }

    #[test]
    fn computes_total_size() {
        let files = vec![
            SearcheeFile { relative_path: "a.mkv".into(), size: 100 },
            SearcheeFile { relative_path: "b.mkv".into(), size: 200 },
        ];
        let s = Searchee::new("x", files, None, SearcheeOrigin::Data { root: "/tmp".into() }).unwrap();
        assert_eq!(s.total_size, 300);
    }
}

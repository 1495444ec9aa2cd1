use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Link kind used when materializing a data-origin match (spec §4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Hardlink,
    Symlink,
    Reflink,
}

impl Default for LinkType {
    fn default() -> Self {
        LinkType::Hardlink
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hardlink" => Ok(LinkType::Hardlink),
            "symlink" => Ok(LinkType::Symlink),
            "reflink" => Ok(LinkType::Reflink),
            other => Err(format!("unknown link type `{}`", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("source and destination are on different filesystems, hardlink not possible")]
    CrossDevice,
    #[error("no size-bijection exists between searchee and candidate files")]
    NoBijection,
    #[error("io error linking `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

/// One file link created by the linker.
#[derive(Debug, Clone)]
pub struct LinkedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Where and how to link a data-origin match.
#[derive(Debug, Clone)]
pub struct LinkPlan {
    pub link_dir: PathBuf,
    pub link_type: LinkType,
    pub flat_linking: bool,
}

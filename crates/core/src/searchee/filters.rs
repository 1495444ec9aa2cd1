//! Extension classification and episode-pack heuristics used by searchee
//! construction (spec §4.B) and the matcher's PARTIAL policy (spec §4.F).

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Video and ignorable-auxiliary extension sets. Exposed as config per
/// spec §9 open question (b); these defaults mirror the GLOSSARY.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionPolicy {
    pub video_extensions: HashSet<String>,
    pub ignorable_extensions: HashSet<String>,
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        let video = [
            "mkv", "mp4", "avi", "m2ts", "ts", "mov", "wmv", "iso", "vob", "bdmv", "m4v",
        ];
        let ignorable = [
            "nfo", "srt", "sub", "idx", "txt", "jpg", "jpeg", "png", "sfv", "md5", "cue",
        ];
        ExtensionPolicy {
            video_extensions: video.iter().map(|s| s.to_string()).collect(),
            ignorable_extensions: ignorable.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExtensionPolicy {
    pub fn is_video(&self, path: &str) -> bool {
        matches_extension(path, &self.video_extensions)
    }

    pub fn is_ignorable(&self, path: &str) -> bool {
        matches_extension(path, &self.ignorable_extensions)
    }

    pub fn is_disc_image(&self, path: &str) -> bool {
        matches_extension(path, &["iso", "vob", "bdmv", "m2ts"].iter().map(|s| s.to_string()).collect())
    }
}

fn matches_extension(path: &str, extensions: &HashSet<String>) -> bool {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    extensions.contains(&ext)
}

/// `true` if `name` is a single-episode release (an `SxxExx` token with no
/// season-pack indication), per spec §4.B `includeSingleEpisodes`.
pub fn is_single_episode(name: &str) -> bool {
    let episode_re = Regex::new(r"(?i)\bS(\d{1,2})E(\d{1,3})\b").unwrap();
    let pack_re = Regex::new(r"(?i)\b(complete|season\s*\d{0,2}\s*(pack|complete)?|s\d{1,2}-s?\d{1,2})\b")
        .unwrap();

    let matches: Vec<_> = episode_re.find_iter(name).collect();
    if matches.len() != 1 {
        return false;
    }
    !pack_re.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_glossary() {
        let policy = ExtensionPolicy::default();
        assert!(policy.is_video("Show.S01E01.mkv"));
        assert!(policy.is_ignorable("Show.S01E01.nfo"));
        assert!(!policy.is_video("Show.S01E01.nfo"));
        assert!(policy.is_disc_image("STREAM/00000.m2ts"));
    }

    #[test]
    fn single_episode_detection() {
        assert!(is_single_episode("Show.Name.S01E02.1080p.WEB-DL"));
        assert!(!is_single_episode("Show.Name.S01.COMPLETE.1080p"));
        assert!(!is_single_episode("Show.Name.Season.1.1080p"));
        assert!(!is_single_episode("Show.Name.1080p.WEB-DL"));
    }
}

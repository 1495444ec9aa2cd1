//! Searchee construction from each of the three origins (spec §4.B).

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use super::filters::ExtensionPolicy;
use super::types::{Searchee, SearcheeError, SearcheeFile, SearcheeOrigin};
use crate::metafile::Metafile;

/// Builds a searchee from a parsed metafile (`torrentDir` origin).
pub fn from_metafile(metafile: &Metafile, mtime: Option<DateTime<Utc>>) -> Result<Searchee, SearcheeError> {
    let files = metafile
        .files
        .iter()
        .map(|f| SearcheeFile { relative_path: f.relative_path(), size: f.length })
        .collect();
    Searchee::new(
        metafile.name.clone(),
        files,
        mtime,
        SearcheeOrigin::Torrent { info_hash: metafile.info_hash.clone() },
    )
}

/// A torrent reported by the active client adapter, used to build a
/// `ClientSearchee`.
pub struct ClientTorrentEntry {
    pub info_hash: String,
    pub name: String,
    pub files: Vec<SearcheeFile>,
    pub completed: bool,
    pub save_path: String,
    pub added_at: Option<DateTime<Utc>>,
}

pub fn from_client_entry(entry: ClientTorrentEntry) -> Result<Searchee, SearcheeError> {
    Searchee::new(
        entry.name,
        entry.files,
        entry.added_at,
        SearcheeOrigin::Client {
            info_hash: entry.info_hash,
            completed: entry.completed,
            save_path: entry.save_path,
        },
    )
}

/// Configuration for data-directory searchee discovery.
pub struct DataSearcheeConfig {
    pub max_data_depth: usize,
    pub block_list: Vec<String>,
    pub include_non_videos: bool,
    pub include_single_episodes: bool,
    pub extensions: ExtensionPolicy,
}

impl Default for DataSearcheeConfig {
    fn default() -> Self {
        DataSearcheeConfig {
            max_data_depth: 2,
            block_list: Vec::new(),
            include_non_videos: false,
            include_single_episodes: false,
            extensions: ExtensionPolicy::default(),
        }
    }
}

/// Walks `data_dirs` up to `config.max_data_depth` levels, yielding one
/// searchee per leaf directory, applying the non-video and
/// single-episode filters of spec §4.B.
pub fn from_data_dirs(data_dirs: &[PathBuf], config: &DataSearcheeConfig) -> Vec<Searchee> {
    let mut out = Vec::new();
    for root in data_dirs {
        walk_level(root, 0, config, &mut out);
    }
    out
}

fn walk_level(dir: &Path, depth: usize, config: &DataSearcheeConfig, out: &mut Vec<Searchee>) {
    let subdirs = match list_subdirs(dir, &config.block_list) {
        Ok(v) => v,
        Err(_) => return,
    };

    if subdirs.is_empty() || depth >= config.max_data_depth {
        if let Some(searchee) = build_leaf_searchee(dir, config) {
            out.push(searchee);
        }
        return;
    }

    for sub in subdirs {
        walk_level(&sub, depth + 1, config, out);
    }
}

fn list_subdirs(dir: &Path, block_list: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if is_hidden(&name) || block_list.iter().any(|b| b == name.as_ref()) {
            continue;
        }
        out.push(entry.path());
    }
    out.sort();
    Ok(out)
}

fn build_leaf_searchee(dir: &Path, config: &DataSearcheeConfig) -> Option<Searchee> {
    let files = collect_files(dir, &config.block_list);
    if files.is_empty() {
        return None;
    }

    let name = dir.file_name()?.to_string_lossy().into_owned();

    if !config.include_non_videos && !files.iter().any(|f| config.extensions.is_video(&f.relative_path)) {
        return None;
    }
    if !config.include_single_episodes && super::filters::is_single_episode(&name) {
        return None;
    }

    let created_at = dir
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(system_time_to_utc);

    Searchee::new(name, files, created_at, SearcheeOrigin::Data { root: dir.to_path_buf() }).ok()
}

fn collect_files(root: &Path, block_list: &[String]) -> Vec<SearcheeFile> {
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(false).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if is_hidden(&file_name) || block_list.iter().any(|b| b == file_name.as_ref()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else { continue };
        let relative_path = relative.to_string_lossy().replace('\\', "/");
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        out.push(SearcheeFile { relative_path, size });
    }
    out.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    out
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn system_time_to_utc(t: SystemTime) -> Option<DateTime<Utc>> {
    t.duration_since(std::time::UNIX_EPOCH).ok().map(|d| {
        DateTime::from_timestamp(d.as_secs() as i64, d.subsec_nanos()).unwrap_or_else(Utc::now)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(path: &Path, contents: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn leaf_directory_becomes_one_searchee() {
        let tmp = tempdir().unwrap();
        let show_dir = tmp.path().join("Show.S01E01.1080p");
        write_file(&show_dir.join("Show.S01E01.mkv"), b"0123456789");
        write_file(&show_dir.join("Show.S01E01.nfo"), b"info");

        let config = DataSearcheeConfig { include_single_episodes: true, ..Default::default() };
        let searchees = from_data_dirs(&[tmp.path().to_path_buf()], &config);
        assert_eq!(searchees.len(), 1);
        assert_eq!(searchees[0].files.len(), 2);
    }

    #[test]
    fn single_episode_dropped_by_default() {
        let tmp = tempdir().unwrap();
        let show_dir = tmp.path().join("Show.S01E01.1080p");
        write_file(&show_dir.join("Show.S01E01.mkv"), b"0123456789");

        let config = DataSearcheeConfig::default();
        let searchees = from_data_dirs(&[tmp.path().to_path_buf()], &config);
        assert!(searchees.is_empty());
    }

    #[test]
    fn non_video_only_dir_dropped_unless_included() {
        let tmp = tempdir().unwrap();
        let album_dir = tmp.path().join("Some.Album");
        write_file(&album_dir.join("track.flac"), b"0123456789");

        let config = DataSearcheeConfig::default();
        let searchees = from_data_dirs(&[tmp.path().to_path_buf()], &config);
        assert!(searchees.is_empty());

        let config = DataSearcheeConfig { include_non_videos: true, ..Default::default() };
        let searchees = from_data_dirs(&[tmp.path().to_path_buf()], &config);
        assert_eq!(searchees.len(), 1);
    }

    #[test]
    fn hidden_files_and_blocklist_excluded() {
        let tmp = tempdir().unwrap();
        let show_dir = tmp.path().join("Movie.2020.1080p");
        write_file(&show_dir.join("Movie.2020.mkv"), b"0123456789");
        write_file(&show_dir.join(".DS_Store"), b"junk");
        write_file(&show_dir.join("sample.mkv"), b"junk");

        let mut config = DataSearcheeConfig::default();
        config.block_list.push("sample.mkv".to_string());
        let searchees = from_data_dirs(&[tmp.path().to_path_buf()], &config);
        assert_eq!(searchees.len(), 1);
        assert_eq!(searchees[0].files.len(), 1);
        assert_eq!(searchees[0].files[0].relative_path, "Movie.2020.mkv");
    }
}

use std::path::{Path, PathBuf};

use super::types::{LinkError, LinkPlan, LinkType, LinkedFile};
use crate::searchee::SearcheeFile;

/// For data-origin matches only. Given the candidate's file list and the
/// searchee's root directory, creates a link tree at
/// `linkDir/[tracker/]candidate_name/...` mirroring the candidate's
/// internal layout (spec §4.G). Never moves or removes a source file.
pub fn link_candidate(
    searchee_root: &Path,
    searchee_files: &[SearcheeFile],
    candidate_name: &str,
    candidate_files: &[SearcheeFile],
    tracker: Option<&str>,
    plan: &LinkPlan,
) -> Result<Vec<LinkedFile>, LinkError> {
    let pairs = resolve_sources(searchee_files, candidate_files).ok_or(LinkError::NoBijection)?;

    let mut dest_root = plan.link_dir.clone();
    if !plan.flat_linking {
        if let Some(tracker) = tracker {
            dest_root.push(sanitize_segment(tracker));
        }
    }
    dest_root.push(sanitize_segment(candidate_name));

    let mut linked = Vec::with_capacity(pairs.len());
    for (source_file, candidate_file) in pairs {
        let source = searchee_root.join(&source_file.relative_path);
        let destination = dest_root.join(&candidate_file.relative_path);
        create_link(&source, &destination, plan.link_type)?;
        linked.push(LinkedFile { source, destination });
    }
    Ok(linked)
}

/// Pairs each candidate file with a source file in the searchee, by exact
/// `(relative_path, size)` first, falling back to a size-sorted bijection
/// for renamed files (the mapping the matcher's RISKY/PARTIAL levels
/// already established exists, but does not itself record).
fn resolve_sources(
    searchee_files: &[SearcheeFile],
    candidate_files: &[SearcheeFile],
) -> Option<Vec<(SearcheeFile, SearcheeFile)>> {
    if searchee_files.len() != candidate_files.len() {
        return None;
    }

    let mut remaining_searchee: Vec<SearcheeFile> = searchee_files.to_vec();
    let mut pairs = Vec::with_capacity(candidate_files.len());
    let mut unmatched_candidates = Vec::new();

    for candidate in candidate_files {
        if let Some(pos) = remaining_searchee
            .iter()
            .position(|f| f.relative_path == candidate.relative_path && f.size == candidate.size)
        {
            pairs.push((remaining_searchee.remove(pos), candidate.clone()));
        } else {
            unmatched_candidates.push(candidate.clone());
        }
    }

    if unmatched_candidates.is_empty() {
        return Some(pairs);
    }

    let mut remaining_sorted = remaining_searchee;
    remaining_sorted.sort_by_key(|f| (f.size, f.relative_path.clone()));
    unmatched_candidates.sort_by_key(|f| (f.size, f.relative_path.clone()));

    for (s, c) in remaining_sorted.into_iter().zip(unmatched_candidates.into_iter()) {
        if s.size != c.size {
            return None;
        }
        pairs.push((s, c));
    }

    Some(pairs)
}

fn create_link(source: &Path, destination: &Path, link_type: LinkType) -> Result<(), LinkError> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LinkError::Io { path: parent.to_path_buf(), source: e })?;
    }

    let result = match link_type {
        LinkType::Hardlink => std::fs::hard_link(source, destination),
        LinkType::Symlink => symlink(source, destination),
        LinkType::Reflink => reflink_copy::reflink(source, destination),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if link_type == LinkType::Hardlink && is_cross_device(&e) => Err(LinkError::CrossDevice),
        Err(e) => Err(LinkError::Io { path: destination.to_path_buf(), source: e }),
    }
}

#[cfg(unix)]
fn symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, destination)
}

#[cfg(not(unix))]
fn symlink(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(source, destination)
}

fn is_cross_device(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18)
}

fn sanitize_segment(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn links_by_exact_path_when_layout_matches() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("source");
        write(&root.join("foo.mkv"), b"0123456789");

        let link_dir = tmp.path().join("links");
        let plan = LinkPlan { link_dir: link_dir.clone(), link_type: LinkType::Hardlink, flat_linking: true };

        let searchee_files = vec![SearcheeFile { relative_path: "foo.mkv".into(), size: 10 }];
        let candidate_files = searchee_files.clone();

        let linked = link_candidate(&root, &searchee_files, "candidate.name", &candidate_files, None, &plan).unwrap();
        assert_eq!(linked.len(), 1);
        assert!(linked[0].destination.exists());
        assert_eq!(std::fs::read(&linked[0].destination).unwrap(), b"0123456789");
    }

    #[test]
    fn links_renamed_files_by_size_bijection() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("source");
        write(&root.join("A.mkv"), b"0123456789");

        let link_dir = tmp.path().join("links");
        let plan = LinkPlan { link_dir, link_type: LinkType::Hardlink, flat_linking: true };

        let searchee_files = vec![SearcheeFile { relative_path: "A.mkv".into(), size: 10 }];
        let candidate_files = vec![SearcheeFile { relative_path: "renamedA.mkv".into(), size: 10 }];

        let linked = link_candidate(&root, &searchee_files, "candidate.name", &candidate_files, None, &plan).unwrap();
        assert_eq!(linked[0].destination.file_name().unwrap(), "renamedA.mkv");
    }

    #[test]
    fn flat_linking_omits_tracker_subdirectory() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("source");
        write(&root.join("foo.mkv"), b"0123456789");
        let link_dir = tmp.path().join("links");

        let searchee_files = vec![SearcheeFile { relative_path: "foo.mkv".into(), size: 10 }];

        let flat = LinkPlan { link_dir: link_dir.clone(), link_type: LinkType::Hardlink, flat_linking: true };
        let linked = link_candidate(&root, &searchee_files, "candidate.name", &searchee_files, Some("tracker1"), &flat).unwrap();
        assert!(!linked[0].destination.to_string_lossy().contains("tracker1"));

        let nested = LinkPlan { link_dir, link_type: LinkType::Hardlink, flat_linking: false };
        let linked = link_candidate(&root, &searchee_files, "candidate.name", &searchee_files, Some("tracker1"), &nested).unwrap();
        assert!(linked[0].destination.to_string_lossy().contains("tracker1"));
    }

    #[test]
    fn mismatched_file_counts_rejected() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("source");
        write(&root.join("foo.mkv"), b"0123456789");
        let link_dir = tmp.path().join("links");
        let plan = LinkPlan { link_dir, link_type: LinkType::Hardlink, flat_linking: true };

        let searchee_files = vec![SearcheeFile { relative_path: "foo.mkv".into(), size: 10 }];
        let candidate_files = vec![
            SearcheeFile { relative_path: "foo.mkv".into(), size: 10 },
            SearcheeFile { relative_path: "foo.nfo".into(), size: 2 },
        ];

        let err = link_candidate(&root, &searchee_files, "candidate.name", &candidate_files, None, &plan).unwrap_err();
        assert!(matches!(err, LinkError::NoBijection));
    }
}

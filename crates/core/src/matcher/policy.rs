use super::types::{CandidateMeta, KnownInfoHashes, MatchMode, MatchPolicy};
use crate::decision::Verdict;
use crate::searchee::{Searchee, SearcheeFile};

/// Checks 1-3 of spec §4.F, shared by the pre-snatch and post-snatch passes.
/// Returns the rejecting verdict, if any.
fn reject_before_file_tree(
    searchee: &Searchee,
    candidate_title: &str,
    candidate_info_hash: Option<&str>,
    candidate_total_size: u64,
    policy: &MatchPolicy,
    known_info_hashes: &KnownInfoHashes,
) -> Option<Verdict> {
    if let Some(hash) = candidate_info_hash {
        let hash = hash.to_ascii_lowercase();
        if searchee.info_hash().is_some_and(|h| h.eq_ignore_ascii_case(&hash))
            || known_info_hashes.contains(&hash)
        {
            return Some(Verdict::InfoHashAlreadyExists);
        }
    }

    if policy.is_blocked(candidate_title, candidate_info_hash) {
        return Some(Verdict::BlockedRelease);
    }

    if !policy.sizes_within_tolerance(searchee.total_size, candidate_total_size) {
        return Some(Verdict::SizeMismatch);
    }

    None
}

/// Pre-snatch pass: the only data available from a Torznab item is its
/// title, size, and (if the indexer advertises it) infohash. Returns
/// `Some(verdict)` when the candidate can be rejected without snatching;
/// `None` means the pipeline should snatch and re-check with
/// [`evaluate`].
pub fn evaluate_preliminary(
    searchee: &Searchee,
    candidate_title: &str,
    candidate_info_hash: Option<&str>,
    candidate_total_size: u64,
    policy: &MatchPolicy,
    known_info_hashes: &KnownInfoHashes,
) -> Option<Verdict> {
    reject_before_file_tree(
        searchee,
        candidate_title,
        candidate_info_hash,
        candidate_total_size,
        policy,
        known_info_hashes,
    )
}

/// Full decision procedure (spec §4.F), run once the candidate's complete
/// file list is known (post-snatch).
pub fn evaluate(
    searchee: &Searchee,
    candidate: &CandidateMeta,
    policy: &MatchPolicy,
    known_info_hashes: &KnownInfoHashes,
) -> Verdict {
    if let Some(verdict) = reject_before_file_tree(
        searchee,
        &candidate.title,
        candidate.info_hash.as_deref(),
        candidate.total_size,
        policy,
        known_info_hashes,
    ) {
        return verdict;
    }

    if exact_tree_match(&searchee.files, &candidate.files) {
        return Verdict::Match;
    }

    match policy.mode {
        MatchMode::Safe => Verdict::FileTreeMismatch,
        MatchMode::Risky => {
            if bijection_by_size(&searchee.files, &candidate.files) {
                Verdict::MatchSizeOnly
            } else {
                Verdict::FileTreeMismatch
            }
        }
        MatchMode::Partial => {
            if bijection_by_size(&searchee.files, &candidate.files) {
                Verdict::MatchSizeOnly
            } else if partial_match(&searchee.files, &candidate.files, policy) {
                Verdict::MatchPartial
            } else {
                Verdict::FileTreeMismatch
            }
        }
    }
}

/// SAFE-level equivalence: the same set of `(relative_path, size)` pairs.
fn exact_tree_match(a: &[SearcheeFile], b: &[SearcheeFile]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_sorted: Vec<_> = a.iter().map(|f| (f.relative_path.as_str(), f.size)).collect();
    let mut b_sorted: Vec<_> = b.iter().map(|f| (f.relative_path.as_str(), f.size)).collect();
    a_sorted.sort_unstable();
    b_sorted.sort_unstable();
    a_sorted == b_sorted
}

/// RISKY-level equivalence: same file count, and every candidate file
/// matches a searchee file by length (a bijection on the size multiset,
/// ignoring path).
fn bijection_by_size(a: &[SearcheeFile], b: &[SearcheeFile]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_sizes: Vec<u64> = a.iter().map(|f| f.size).collect();
    let mut b_sizes: Vec<u64> = b.iter().map(|f| f.size).collect();
    a_sizes.sort_unstable();
    b_sizes.sort_unstable();
    a_sizes == b_sizes
}

/// PARTIAL-level equivalence: ignorable auxiliary files may appear on only
/// one side; the remaining files must satisfy RISKY-level equivalence.
fn partial_match(a: &[SearcheeFile], b: &[SearcheeFile], policy: &MatchPolicy) -> bool {
    let a_core: Vec<SearcheeFile> = a
        .iter()
        .filter(|f| !policy.extensions.is_ignorable(&f.relative_path))
        .cloned()
        .collect();
    let b_core: Vec<SearcheeFile> = b
        .iter()
        .filter(|f| !policy.extensions.is_ignorable(&f.relative_path))
        .cloned()
        .collect();
    if a_core.is_empty() || b_core.is_empty() {
        return false;
    }
    exact_tree_match(&a_core, &b_core) || bijection_by_size(&a_core, &b_core)
}

/// Whether a successful injection should be followed by `recheckTorrent`
/// (spec §4.J): true for `MATCH_PARTIAL` results, and for any searchee
/// containing disc-image files regardless of verdict.
pub fn should_recheck(verdict: Verdict, searchee: &Searchee, policy: &MatchPolicy) -> bool {
    if verdict.requires_recheck() {
        return true;
    }
    searchee.files.iter().any(|f| policy.extensions.is_disc_image(&f.relative_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searchee::SearcheeOrigin;
    use std::collections::HashSet;

    fn searchee(files: Vec<(&str, u64)>) -> Searchee {
        let files = files
            .into_iter()
            .map(|(p, s)| SearcheeFile { relative_path: p.into(), size: s })
            .collect();
        Searchee::new("Show.S01E01", files, None, SearcheeOrigin::Data { root: "/tmp".into() }).unwrap()
    }

    fn candidate(title: &str, files: Vec<(&str, u64)>) -> CandidateMeta {
        let files: Vec<SearcheeFile> = files
            .into_iter()
            .map(|(p, s)| SearcheeFile { relative_path: p.into(), size: s })
            .collect();
        let total_size = files.iter().map(|f| f.size).sum();
        CandidateMeta { title: title.into(), info_hash: None, total_size, files }
    }

    fn policy(mode: MatchMode) -> MatchPolicy {
        MatchPolicy { mode, ..Default::default() }
    }

    #[test]
    fn identical_torrents_different_tracker_is_match() {
        let s = searchee(vec![("foo.mkv", 1_000_000_000)]);
        let c = candidate("foo.mkv", vec![("foo.mkv", 1_000_000_000)]);
        let known = HashSet::new();
        assert_eq!(evaluate(&s, &c, &policy(MatchMode::Safe), &known), Verdict::Match);
    }

    #[test]
    fn renamed_files_risky_vs_safe() {
        let s = searchee(vec![("A.mkv", 1_000_000_000), ("B.mkv", 500_000_000)]);
        let c = candidate("renamed", vec![("renamedA.mkv", 1_000_000_000), ("renamedB.mkv", 500_000_000)]);
        let known = HashSet::new();
        assert_eq!(evaluate(&s, &c, &policy(MatchMode::Risky), &known), Verdict::MatchSizeOnly);
        assert_eq!(evaluate(&s, &c, &policy(MatchMode::Safe), &known), Verdict::FileTreeMismatch);
    }

    #[test]
    fn nfo_added_is_partial_but_not_risky() {
        let s = searchee(vec![("ep.mkv", 1_000_000_000)]);
        let c = candidate("ep", vec![("ep.mkv", 1_000_000_000), ("ep.nfo", 2048)]);
        let known = HashSet::new();
        let verdict = evaluate(&s, &c, &policy(MatchMode::Partial), &known);
        assert_eq!(verdict, Verdict::MatchPartial);
        assert!(should_recheck(verdict, &s, &policy(MatchMode::Partial)));
        assert_eq!(evaluate(&s, &c, &policy(MatchMode::Risky), &known), Verdict::FileTreeMismatch);
    }

    #[test]
    fn size_just_over_fuzzy_threshold_rejected() {
        let s = searchee(vec![("foo.mkv", 1_000_000_000)]);
        let c = candidate("foo.mkv", vec![("foo.mkv", 1_025_000_000)]);
        let known = HashSet::new();
        assert_eq!(evaluate(&s, &c, &policy(MatchMode::Safe), &known), Verdict::SizeMismatch);

        let mut lenient = policy(MatchMode::Safe);
        lenient.fuzzy_size_threshold = 0.05;
        assert_eq!(evaluate(&s, &c, &lenient, &known), Verdict::FileTreeMismatch);
    }

    #[test]
    fn known_info_hash_rejected_before_snatch() {
        let s = searchee(vec![("foo.mkv", 1_000_000_000)]);
        let mut known = HashSet::new();
        known.insert("deadbeef".to_string());
        let verdict = evaluate_preliminary(&s, "foo.mkv", Some("deadbeef"), 1_000_000_000, &policy(MatchMode::Safe), &known);
        assert_eq!(verdict, Some(Verdict::InfoHashAlreadyExists));
    }

    #[test]
    fn blocked_release_rejected_by_title() {
        let s = searchee(vec![("foo.mkv", 1_000_000_000)]);
        let mut p = policy(MatchMode::Safe);
        p.block_list.push("bad.release".to_string());
        let known = HashSet::new();
        let verdict = evaluate_preliminary(&s, "bad.release", None, 1_000_000_000, &p, &known);
        assert_eq!(verdict, Some(Verdict::BlockedRelease));
    }

    #[test]
    fn disc_image_searchee_always_rechecked() {
        let s = searchee(vec![("BDMV/STREAM/00000.m2ts", 1_000_000_000)]);
        let c = candidate("disc", vec![("BDMV/STREAM/00000.m2ts", 1_000_000_000)]);
        let known = HashSet::new();
        let verdict = evaluate(&s, &c, &policy(MatchMode::Safe), &known);
        assert_eq!(verdict, Verdict::Match);
        assert!(should_recheck(verdict, &s, &policy(MatchMode::Safe)));
    }

    #[test]
    fn preliminary_pass_defers_to_full_evaluation() {
        let s = searchee(vec![("foo.mkv", 1_000_000_000)]);
        let known = HashSet::new();
        let verdict = evaluate_preliminary(&s, "foo.mkv", None, 1_000_000_000, &policy(MatchMode::Safe), &known);
        assert!(verdict.is_none());
    }
}

use regex_lite::Regex;

use super::types::{QueryKind, QueryPlan};
use crate::indexer::Indexer;
use crate::searchee::Searchee;

/// Builds a query plan for `searchee` against `indexer`, or `None` if the
/// indexer does not advertise the capability the chosen query kind needs
/// (spec §4.E).
pub fn build_query_plan(searchee: &Searchee, indexer: &Indexer) -> Option<QueryPlan> {
    let (kind, season, episode) = classify_name(&searchee.name);

    let has_cap = match kind {
        QueryKind::TvSearch => indexer.caps.tv,
        QueryKind::Movie => indexer.caps.movie,
        QueryKind::Music => indexer.caps.music,
        QueryKind::Book => indexer.caps.book,
        QueryKind::Search => indexer.caps.search,
    };
    if !has_cap {
        return None;
    }

    Some(QueryPlan {
        indexer_id: indexer.id,
        kind,
        terms: normalize_title(&searchee.name),
        season,
        episode,
    })
}

fn classify_name(name: &str) -> (QueryKind, Option<u32>, Option<u32>) {
    let episode_re = Regex::new(r"(?i)\bS(\d{1,2})E(\d{1,3})\b").unwrap();
    if let Some(caps) = episode_re.captures(name) {
        let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
        return (QueryKind::TvSearch, season, episode);
    }

    let year_re = Regex::new(r"\b(19|20)\d{2}\b").unwrap();
    if year_re.is_match(name) {
        return (QueryKind::Movie, None, None);
    }

    (QueryKind::Search, None, None)
}

/// Strips release-group noise (dots, brackets, scene tags) to produce the
/// search terms sent to the indexer.
fn normalize_title(name: &str) -> String {
    let cleaned = name.replace(['.', '_'], " ");
    let bracket_re = Regex::new(r"[\[\(].*?[\]\)]").unwrap();
    let cleaned = bracket_re.replace_all(&cleaned, "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::IndexerCaps;

    fn indexer(caps: IndexerCaps) -> Indexer {
        Indexer {
            id: 1,
            url: "https://example.test".into(),
            apikey: "key".into(),
            name: None,
            active: true,
            status: crate::indexer::IndexerStatus::Ok,
            retry_after: None,
            status_count: 0,
            caps,
        }
    }

    #[test]
    fn tv_episode_selects_tvsearch_when_capable() {
        let s = Searchee::new(
            "Show.Name.S02E05.1080p.WEB-DL",
            vec![crate::searchee::SearcheeFile { relative_path: "a.mkv".into(), size: 1 }],
            None,
            crate::searchee::SearcheeOrigin::Data { root: "/tmp".into() },
        )
        .unwrap();
        let idx = indexer(IndexerCaps { tv: true, search: true, ..Default::default() });
        let plan = build_query_plan(&s, &idx).unwrap();
        assert_eq!(plan.kind.as_param(), "tvsearch");
        assert_eq!(plan.season, Some(2));
        assert_eq!(plan.episode, Some(5));
    }

    #[test]
    fn skips_indexer_lacking_capability() {
        let s = Searchee::new(
            "Show.Name.S02E05.1080p.WEB-DL",
            vec![crate::searchee::SearcheeFile { relative_path: "a.mkv".into(), size: 1 }],
            None,
            crate::searchee::SearcheeOrigin::Data { root: "/tmp".into() },
        )
        .unwrap();
        let idx = indexer(IndexerCaps { tv: false, search: true, ..Default::default() });
        assert!(build_query_plan(&s, &idx).is_none());
    }

    #[test]
    fn movie_year_token_selects_movie_kind() {
        let s = Searchee::new(
            "Some.Movie.2019.1080p.BluRay",
            vec![crate::searchee::SearcheeFile { relative_path: "a.mkv".into(), size: 1 }],
            None,
            crate::searchee::SearcheeOrigin::Data { root: "/tmp".into() },
        )
        .unwrap();
        let idx = indexer(IndexerCaps { movie: true, search: true, ..Default::default() });
        let plan = build_query_plan(&s, &idx).unwrap();
        assert_eq!(plan.kind.as_param(), "movie");
    }

    #[test]
    fn normalize_strips_dots_and_brackets() {
        assert_eq!(normalize_title("Show.Name.S01E01.[Group]"), "Show Name S01E01");
    }
}

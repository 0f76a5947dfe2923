//! Keyword lookup with fallback patterns and ranking

use crate::storage::{IndexStore, KeywordPattern, KeywordRow, StorageResult};
use std::collections::HashSet;

/// One lookup result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchHit {
    pub title: String,
    pub keyword: String,
    pub url: String,
}

impl From<KeywordRow> for SearchHit {
    fn from(row: KeywordRow) -> Self {
        Self {
            title: row.title,
            keyword: row.keyword,
            url: row.url,
        }
    }
}

/// Patterns tried in order until one matches
fn fallback_patterns(pattern: &str) -> [KeywordPattern; 6] {
    [
        KeywordPattern::Exact(pattern.to_string()),
        KeywordPattern::Prefix(format!("{} ", pattern)),
        KeywordPattern::Suffix(format!(" {}", pattern)),
        KeywordPattern::Contains(format!(" {} ", pattern)),
        KeywordPattern::Prefix(pattern.to_string()),
        KeywordPattern::Contains(pattern.to_string()),
    ]
}

/// Looks up `pattern` in the index
///
/// The first fallback pattern with any match wins: exact keyword, then
/// `"pattern "` prefix, `" pattern"` suffix, `" pattern "` interior token,
/// plain prefix, and finally any substring. Hits are de-duplicated and
/// ranked by:
///
/// 1. exact match first
/// 2. `std::`-prefixed keyword first
/// 3. `std::`-prefixed title first
/// 4. earlier position of `pattern` in the keyword
/// 5. keyword, then title, lexicographically
///
/// An empty result means "no matching entry"; it is not an error.
pub fn search<S: IndexStore + ?Sized>(store: &S, pattern: &str) -> StorageResult<Vec<SearchHit>> {
    if pattern.is_empty() {
        return Ok(Vec::new());
    }

    for candidate in fallback_patterns(pattern) {
        let rows = store.search_keywords(&candidate)?;
        if !rows.is_empty() {
            tracing::debug!("{:?} matched {} keywords", candidate, rows.len());
            return Ok(rank(rows, pattern));
        }
    }

    Ok(Vec::new())
}

fn rank(rows: Vec<KeywordRow>, pattern: &str) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    let mut hits: Vec<SearchHit> = rows
        .into_iter()
        .map(SearchHit::from)
        .filter(|hit| seen.insert(hit.clone()))
        .collect();

    hits.sort_by_cached_key(|hit| {
        (
            hit.keyword != pattern,
            !hit.keyword.starts_with("std::"),
            !hit.title.starts_with("std::"),
            hit.keyword.find(pattern).unwrap_or(usize::MAX),
            hit.keyword.clone(),
            hit.title.clone(),
        )
    });

    hits
}

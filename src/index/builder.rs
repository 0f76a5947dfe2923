//! Index builder - turns one crawl's accumulated entries into index rows
//!
//! Steps, all inside a single rebuild transaction:
//! 1. Disambiguate titles found at more than one URL
//! 2. Insert one row per title and one keyword row per keyword
//! 3. Propagate alias pairs onto matching keyword rows
//! 4. Drop exact duplicate keywords and number colliding ones
//! 5. Record build metadata and commit
//!
//! Any error rolls the transaction back, leaving the previous index intact.

use crate::crawler::{CrawlReport, Crawler};
use crate::index::entry::{Accumulator, Alias, Entry};
use crate::index::page::PageIndexer;
use crate::storage::{IndexStore, KeywordPattern, KeywordRow, StorageResult};
use crate::{CrawlError, RefIndexError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use url::Url;

/// Upper bound on renaming passes; each pass lengthens every renamed keyword
const MAX_RENAME_PASSES: usize = 8;

/// A page ready for insertion, with its final unique title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedPage {
    pub title: String,
    pub url: String,
    pub keywords: BTreeSet<String>,
    pub aliases: BTreeSet<Alias>,
}

/// Counts from one committed build
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub build_id: i64,
    pub rows: u64,
    pub keywords: u64,
    pub aliases_added: usize,
    pub renamed: usize,
}

/// Outcome of a full crawl-and-build
#[derive(Debug, Clone)]
pub struct RebuildReport {
    pub crawl: CrawlReport,
    pub build: BuildSummary,
}

/// Builds the persisted index from a crawl
pub struct IndexBuilder {
    config_hash: String,
    blacklist: Vec<String>,
}

impl IndexBuilder {
    /// Creates a builder; `config_hash` is stored with each build
    pub fn new(config_hash: impl Into<String>) -> Self {
        Self {
            config_hash: config_hash.into(),
            blacklist: Vec::new(),
        }
    }

    /// URLs that are fetched but never indexed or followed
    pub fn with_blacklist(mut self, blacklist: Vec<String>) -> Self {
        self.blacklist = blacklist;
        self
    }

    /// Crawls `origin` and replaces the index in `store`
    ///
    /// Nothing is written unless the crawl completes; a cancelled crawl
    /// returns `CrawlError::Cancelled` with the store untouched.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use refindex::config::load_config_with_hash;
    /// use refindex::crawler::Crawler;
    /// use refindex::index::IndexBuilder;
    /// use refindex::storage::open_storage;
    /// use std::path::Path;
    ///
    /// # async fn example() -> refindex::Result<()> {
    /// let (config, hash) = load_config_with_hash(Path::new("refindex.toml"))?;
    /// let crawler = Crawler::new(config.crawler.clone(), &config.user_agent)?;
    /// let mut store = open_storage(Path::new(&config.output.database_path))?;
    ///
    /// let report = IndexBuilder::new(hash)
    ///     .rebuild(&crawler, &config.source.origin, config.source.path.as_deref(), &mut store)
    ///     .await?;
    /// println!("{} rows", report.build.rows);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn rebuild<S: IndexStore>(
        &self,
        crawler: &Crawler,
        origin: &str,
        path_override: Option<&str>,
        store: &mut S,
    ) -> Result<RebuildReport, RefIndexError> {
        let started_at = Utc::now();

        let (indexer, records) = PageIndexer::new(self.blacklist.clone());
        let consumer = tokio::spawn(Accumulator::collect(records));

        let crawl = match crawler.crawl(origin, path_override, Arc::new(indexer)).await {
            Ok(report) => report,
            Err(e) => {
                consumer.abort();
                return Err(e.into());
            }
        };

        let accumulator = consumer
            .await
            .map_err(|e| CrawlError::Worker(e.to_string()))?;

        tracing::info!(
            "Crawl produced {} titles from {} documents",
            accumulator.len(),
            crawl.succeeded
        );

        let build = self.write(accumulator, store, started_at)?;
        Ok(RebuildReport { crawl, build })
    }

    /// Writes accumulated entries as a new index, committing on success
    pub fn write<S: IndexStore>(
        &self,
        accumulator: Accumulator,
        store: &mut S,
        started_at: DateTime<Utc>,
    ) -> StorageResult<BuildSummary> {
        store.begin_rebuild()?;

        match self.populate(accumulator, store, started_at) {
            Ok(summary) => {
                store.commit()?;
                tracing::info!(
                    "Index build {} committed: {} rows, {} keywords ({} aliases, {} renamed)",
                    summary.build_id,
                    summary.rows,
                    summary.keywords,
                    summary.aliases_added,
                    summary.renamed
                );
                Ok(summary)
            }
            Err(e) => {
                if let Err(rollback) = store.rollback() {
                    tracing::warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    fn populate<S: IndexStore>(
        &self,
        accumulator: Accumulator,
        store: &mut S,
        started_at: DateTime<Utc>,
    ) -> StorageResult<BuildSummary> {
        let pages = disambiguate_titles(accumulator.into_entries());
        let mut aliases = BTreeSet::new();

        for page in &pages {
            let id = store.insert_row(&page.title, &page.url)?;
            for keyword in &page.keywords {
                store.insert_keyword(id, keyword)?;
            }
            aliases.extend(page.aliases.iter().cloned());
        }
        tracing::debug!("Inserted {} rows, {} alias pairs", pages.len(), aliases.len());

        let aliases_added = propagate_aliases(store, &aliases)?;
        let renamed = rename_colliding_keywords(store)?;
        let build_id = store.record_build(started_at, &self.config_hash)?;

        Ok(BuildSummary {
            build_id,
            rows: store.count_rows()?,
            keywords: store.count_keywords()?,
            aliases_added,
            renamed,
        })
    }
}

/// Path segments that tell a set of URLs apart
///
/// Each URL (trailing `/` ignored) is split on `/`; the segments common to
/// the start of all URLs and to the end of all URLs are removed, and what
/// remains is joined back with `/`.
///
/// # Examples
///
/// ```
/// use refindex::index::distinguishing_segments;
///
/// let urls = [
///     "https://example.com/w/cpp/container/vector/begin",
///     "https://example.com/w/cpp/container/list/begin/",
/// ];
/// assert_eq!(distinguishing_segments(&urls), vec!["vector", "list"]);
/// ```
pub fn distinguishing_segments(urls: &[&str]) -> Vec<String> {
    let split: Vec<Vec<&str>> = urls
        .iter()
        .map(|u| u.trim_end_matches('/').split('/').collect())
        .collect();

    let Some(first) = split.first() else {
        return Vec::new();
    };
    let min_len = split.iter().map(Vec::len).min().unwrap_or(0);

    let prefix = (0..min_len)
        .take_while(|&i| split.iter().all(|s| s[i] == first[i]))
        .count();
    let suffix = (0..min_len - prefix)
        .take_while(|&i| {
            split
                .iter()
                .all(|s| s[s.len() - 1 - i] == first[first.len() - 1 - i])
        })
        .count();

    split
        .iter()
        .map(|s| s[prefix..s.len() - suffix].join("/"))
        .collect()
}

fn url_path(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

/// Assigns every occurrence a title and URL unique across the index
pub fn disambiguate_titles(entries: Vec<Entry>) -> Vec<IndexedPage> {
    let mut used_titles = HashSet::new();
    let mut used_urls = HashSet::new();
    let mut pages = Vec::new();

    for entry in entries {
        let titles: Vec<String> = if entry.is_ambiguous() {
            let urls: Vec<&str> = entry.occurrences.iter().map(|o| o.url.as_str()).collect();
            distinguishing_segments(&urls)
                .into_iter()
                .zip(&urls)
                .map(|(remaining, url)| {
                    if remaining.is_empty() {
                        format!("{} ({})", entry.title, url_path(url))
                    } else {
                        format!("{} ({})", entry.title, remaining)
                    }
                })
                .collect()
        } else {
            vec![entry.title.clone()]
        };

        for (title, occurrence) in titles.into_iter().zip(entry.occurrences) {
            if !used_urls.insert(occurrence.url.clone()) {
                tracing::warn!("{} indexed under two titles; keeping the first", occurrence.url);
                continue;
            }

            let title = if used_titles.contains(&title) {
                format!("{} ({})", entry.title, occurrence.url)
            } else {
                title
            };
            used_titles.insert(title.clone());

            pages.push(IndexedPage {
                title,
                url: occurrence.url,
                keywords: occurrence.keywords,
                aliases: occurrence.aliases,
            });
        }
    }

    pages
}

/// Keyword patterns where `k` appears as a whole token
fn token_patterns(k: &str) -> [KeywordPattern; 6] {
    [
        KeywordPattern::Suffix(format!("::{}", k)),
        KeywordPattern::Prefix(format!("{}::", k)),
        KeywordPattern::Exact(k.to_string()),
        KeywordPattern::Prefix(format!("{} ", k)),
        KeywordPattern::Prefix(format!("{})", k)),
        KeywordPattern::Prefix(format!("{},", k)),
    ]
}

/// For each alias pair `(k, a)`, adds a copy of every keyword row matching
/// `k` as a token with `k` replaced by `a`
///
/// Matching is purely textual, so an unrelated keyword in another scope can
/// gain a propagated alias too.
pub fn propagate_aliases<S: IndexStore + ?Sized>(
    store: &mut S,
    aliases: &BTreeSet<Alias>,
) -> StorageResult<usize> {
    let mut added = 0;

    for (k, a) in aliases {
        for row in store.select_keywords(&token_patterns(k))? {
            let replaced = row.keyword.replace(k.as_str(), a);
            if replaced != row.keyword {
                store.insert_keyword(row.id, &replaced)?;
                added += 1;
            }
        }
    }

    tracing::debug!("Propagated {} alias keywords", added);
    Ok(added)
}

/// Collision order: `std::` keywords, then `std::` titles, then keyword, then title
fn collision_priority(row: &KeywordRow) -> (bool, bool, String, String) {
    (
        !row.keyword.contains("std::"),
        !row.title.contains("std::"),
        row.keyword.clone(),
        row.title.clone(),
    )
}

/// Numbers every keyword that resolves to more than one row
///
/// Returns the number of keyword rows renamed.
pub fn rename_colliding_keywords<S: IndexStore + ?Sized>(store: &mut S) -> StorageResult<usize> {
    let mut renamed = 0;

    for _ in 0..MAX_RENAME_PASSES {
        store.delete_duplicate_keywords()?;
        let colliding = store.colliding_keywords()?;
        if colliding.is_empty() {
            return Ok(renamed);
        }

        for keyword in colliding {
            let mut group = store.keyword_group(&keyword)?;
            group.sort_by_cached_key(collision_priority);

            for (i, row) in group.iter().enumerate() {
                let numbered = format!("{} ({})", row.keyword, i + 1);
                renamed += store.update_keyword(row.id, &row.keyword, &numbered)?;
            }
        }
    }

    let remaining = store.colliding_keywords()?.len();
    if remaining > 0 {
        tracing::warn!("{} keywords still collide after renaming", remaining);
    }
    Ok(renamed)
}

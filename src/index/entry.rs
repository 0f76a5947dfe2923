//! Per-title accumulator
//!
//! Workers never touch the accumulator directly: each indexed page is sent as
//! a [`PageRecord`] over a channel to a single consumer task that owns the
//! map.

use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::mpsc;

/// An alternate lookup string: (canonical fragment, replacement)
pub type Alias = (String, String);

/// Everything extracted from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub title: String,
    pub url: String,
    pub keywords: BTreeSet<String>,
    pub aliases: BTreeSet<Alias>,
}

impl PageRecord {
    /// Builds a record from the page's primary and secondary names
    pub fn new(title: String, url: String, names: impl IntoIterator<Item = String>) -> Self {
        let keywords = expand_keywords(names);
        let aliases = alias_pairs(&keywords);
        Self {
            title,
            url,
            keywords,
            aliases,
        }
    }
}

/// One URL at which a title was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub url: String,
    pub keywords: BTreeSet<String>,
    pub aliases: BTreeSet<Alias>,
}

/// All occurrences of one page title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    pub occurrences: Vec<Occurrence>,
}

impl Entry {
    fn new(title: String) -> Self {
        Self {
            title,
            occurrences: Vec::new(),
        }
    }

    fn add(&mut self, occurrence: Occurrence) -> bool {
        if self.occurrences.iter().any(|o| o.url == occurrence.url) {
            return false;
        }
        self.occurrences.push(occurrence);
        true
    }

    pub fn is_ambiguous(&self) -> bool {
        self.occurrences.len() > 1
    }
}

/// Title → entry map built during one crawl
#[derive(Debug, Default)]
pub struct Accumulator {
    entries: BTreeMap<String, Entry>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page; returns false if this title was already seen at this URL
    pub fn insert(&mut self, record: PageRecord) -> bool {
        let occurrence = Occurrence {
            url: record.url,
            keywords: record.keywords,
            aliases: record.aliases,
        };
        self.entries
            .entry(record.title.clone())
            .or_insert_with(|| Entry::new(record.title))
            .add(occurrence)
    }

    /// Drains `records` until every sender is dropped
    pub async fn collect(mut records: mpsc::UnboundedReceiver<PageRecord>) -> Self {
        let mut accumulator = Self::new();
        while let Some(record) = records.recv().await {
            if !accumulator.insert(record) {
                tracing::debug!("Duplicate page record ignored");
            }
        }
        tracing::debug!("Accumulated {} titles", accumulator.len());
        accumulator
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in title order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries.into_values().collect()
    }
}

/// Adds a `std::`-stripped duplicate of every name containing `std::`
pub fn expand_keywords(names: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();
    for name in names {
        let name = name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        if name.contains("std::") {
            let stripped = name.replace("std::", "");
            if !stripped.is_empty() {
                keywords.insert(stripped);
            }
        }
        keywords.insert(name);
    }
    keywords
}

/// Length in bytes of the longest common prefix, on char boundaries
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

/// Derives alias pairs from a page's keywords
///
/// - `(kw, kw without std::)` for every keyword containing `std::`
/// - for every other keyword sharing a prefix longer than two characters
///   that ends at a `::` boundary, the pair of both remainders
///
/// Pairs with an empty side or identical sides are dropped.
///
/// # Examples
///
/// ```
/// use refindex::index::alias_pairs;
/// use std::collections::BTreeSet;
///
/// let keywords: BTreeSet<String> = ["std::vector::at", "vector::at"]
///     .into_iter()
///     .map(String::from)
///     .collect();
/// let aliases = alias_pairs(&keywords);
/// assert!(aliases.contains(&("std::vector::at".to_string(), "vector::at".to_string())));
/// ```
pub fn alias_pairs(keywords: &BTreeSet<String>) -> BTreeSet<Alias> {
    let mut aliases = BTreeSet::new();
    let mut push = |k: &str, a: &str| {
        if !k.is_empty() && !a.is_empty() && k != a {
            aliases.insert((k.to_string(), a.to_string()));
        }
    };

    for keyword in keywords {
        if keyword.contains("std::") {
            push(keyword, &keyword.replace("std::", ""));
        }

        for other in keywords {
            if other == keyword {
                continue;
            }
            let size = common_prefix_len(keyword, other);
            let prefix = &keyword[..size];
            if prefix.chars().count() > 2 && prefix.ends_with("::") {
                push(&keyword[size..], &other[size..]);
            }
        }
    }

    aliases
}

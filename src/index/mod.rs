//! Index module: from crawled pages to a searchable keyword index
//!
//! This module contains:
//! - Title splitting and keyword/alias extraction per page
//! - The per-title accumulator fed by the crawl
//! - The index builder (disambiguation, alias propagation, renaming)
//! - Keyword search

mod builder;
mod entry;
mod page;
mod search;
mod title;

pub use builder::{
    disambiguate_titles, distinguishing_segments, propagate_aliases, rename_colliding_keywords,
    BuildSummary, IndexBuilder, IndexedPage, RebuildReport,
};
pub use entry::{alias_pairs, expand_keywords, Accumulator, Alias, Entry, Occurrence, PageRecord};
pub use page::{extract_secondary_keywords, extract_title, index_page, PageIndexer};
pub use search::{search, SearchHit};
pub use title::{qualifier, split_title, strip_template_args};

//! Per-page title and keyword extraction
//!
//! **Title:** the text of the first `<h1>`, inner tags stripped, entities
//! decoded, newlines removed.
//!
//! **Secondary keywords:**
//! - the first typedef-style table (two-column rows under a `Type` header),
//!   skipping tables that follow a "Member types" heading
//! - "Helper variable template" and "Helper types" sections, taking the
//!   symbol on the left of each row's trailing `=`

use crate::crawler::{Document, DocumentHandler};
use crate::index::entry::PageRecord;
use crate::index::title::split_title;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tokio::sync::mpsc;
use url::Url;

/// Section anchors whose following table declares helper symbols
const HELPER_SECTIONS: &str = "span#Helper_variable_template, span#Helper_types";

static ASSIGNMENT_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.* (\S+)\s*=.*$").expect("ASSIGNMENT_TARGET: hardcoded regex is valid")
});

fn element_text(element: &ElementRef) -> String {
    element.text().collect()
}

/// Extracts the page title from the first top-level heading
pub fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("h1").ok()?;
    let heading = document.select(&selector).next()?;
    let title = element_text(&heading).replace('\n', "");
    let title = title.trim();

    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Names listed in the first typedef table
fn typedef_names(document: &Html) -> Vec<String> {
    let (Ok(table_selector), Ok(row_selector), Ok(cell_selector)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("td"),
    ) else {
        return Vec::new();
    };

    let mut names = Vec::new();

    for table in document.select(&table_selector) {
        let heading = table
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "h3");
        if heading.is_some_and(|h| element_text(&h).trim() == "Member types") {
            continue;
        }

        let mut typedef_table = false;
        for row in table.select(&row_selector) {
            let cells: Vec<_> = row.select(&cell_selector).collect();
            if cells.len() != 2 {
                continue;
            }

            let first = element_text(&cells[0]);
            if first.trim_start().starts_with("Type") {
                typedef_table = true;
            } else if typedef_table {
                if let Some(name) = first.split_whitespace().next() {
                    names.push(name.to_string());
                }
            } else {
                break;
            }
        }

        if typedef_table {
            break;
        }
    }

    names
}

/// Symbols declared in helper sections
fn helper_names(document: &Html) -> Vec<String> {
    let (Ok(heading_selector), Ok(anchor_selector), Ok(row_selector)) = (
        Selector::parse("h3"),
        Selector::parse(HELPER_SECTIONS),
        Selector::parse("tr"),
    ) else {
        return Vec::new();
    };

    let mut names = Vec::new();

    for heading in document.select(&heading_selector) {
        if heading.select(&anchor_selector).next().is_none() {
            continue;
        }

        let Some(table) = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .filter(|e| e.value().name() == "table")
        else {
            continue;
        };

        for row in table.select(&row_selector) {
            let text = element_text(&row).replace('\n', " ");
            if let Some(caps) = ASSIGNMENT_TARGET.captures(&text) {
                names.push(caps[1].to_string());
            }
        }
    }

    names
}

/// Extracts secondary keywords from the page body
pub fn extract_secondary_keywords(document: &Html) -> Vec<String> {
    let mut names = typedef_names(document);
    names.extend(helper_names(document));
    names
}

/// Builds the record for one page, or None if it has no title heading
pub fn index_page(url: &str, body: &str) -> Option<PageRecord> {
    let document = Html::parse_document(body);
    let title = extract_title(&document)?;

    let mut names = split_title(&title);
    names.extend(extract_secondary_keywords(&document));

    Some(PageRecord::new(title, url.to_string(), names))
}

/// Document handler that indexes every fetched page
///
/// Records go to a single consumer over an unbounded channel; see
/// [`crate::index::Accumulator::collect`].
pub struct PageIndexer {
    blacklist: HashSet<String>,
    records: mpsc::UnboundedSender<PageRecord>,
}

impl PageIndexer {
    /// Creates an indexer and the receiving end of its record channel
    pub fn new(
        blacklist: impl IntoIterator<Item = String>,
    ) -> (Self, mpsc::UnboundedReceiver<PageRecord>) {
        let blacklist = blacklist
            .into_iter()
            .map(|u| Url::parse(&u).map(|p| p.to_string()).unwrap_or(u))
            .collect();
        let (records, receiver) = mpsc::unbounded_channel();
        (Self { blacklist, records }, receiver)
    }

    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.blacklist.contains(url)
    }
}

impl DocumentHandler for PageIndexer {
    fn process_document(&self, document: Document, depth: u32) -> bool {
        if self.is_blacklisted(&document.url) {
            tracing::info!("Skipping blacklisted page {}", document.url);
            return false;
        }

        tracing::debug!("Indexing {} (depth {})", document.url, depth);

        match index_page(&document.url, &document.body) {
            Some(record) => {
                if self.records.send(record).is_err() {
                    tracing::warn!("Index consumer closed; dropping {}", document.url);
                }
            }
            None => {
                tracing::warn!("No title heading in {}; not indexed", document.url);
            }
        }

        true
    }
}

//! HTML link extraction
//!
//! **Include:**
//! - `<a href="...">` tags anywhere in the document
//! - `<link rel="canonical" href="...">`
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` links, data URIs, fragment-only links
//!
//! Links come back resolved, deduplicated, and sorted.

use crate::url::resolve_link;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

/// Extracts all followable links from an HTML document
///
/// # Example
///
/// ```
/// use refindex::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a><a href="/page">Again</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base_url, false);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].as_str(), "https://example.com/page");
/// ```
pub fn extract_links(html: &str, base_url: &Url, keep_fragment: bool) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut links = BTreeSet::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(base_url, href, keep_fragment) {
                    links.insert(absolute_url);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(base_url, href, keep_fragment) {
                    links.insert(absolute_url);
                }
            }
        }
    }

    links.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn links(html: &str) -> Vec<String> {
        extract_links(html, &base_url(), false)
            .into_iter()
            .map(|u| u.to_string())
            .collect()
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<html><body><a href="https://other.com/page">Link</a></body></html>"#;
        assert_eq!(links(html), vec!["https://other.com/page"]);
    }

    #[test]
    fn test_extract_relative_link() {
        let html = r#"<html><body><a href="/other">Link</a></body></html>"#;
        assert_eq!(links(html), vec!["https://example.com/other"]);
    }

    #[test]
    fn test_extract_relative_path_link() {
        let html = r#"<html><body><a href="other">Link</a></body></html>"#;
        assert_eq!(links(html), vec!["https://example.com/other"]);
    }

    #[test]
    fn test_skip_javascript_link() {
        let html = r#"<html><body><a href="javascript:void(0)">Link</a></body></html>"#;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_skip_mailto_link() {
        let html = r#"<html><body><a href="mailto:test@example.com">Email</a></body></html>"#;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_skip_download_link() {
        let html = r#"<html><body><a href="/file.pdf" download>Download</a></body></html>"#;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_skip_fragment_only() {
        let html = r##"<html><body><a href="#section">Jump</a></body></html>"##;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_fragments_collapse_to_one_link() {
        let html = r##"<html><body>
            <a href="/w/cpp/vector#Notes">Notes</a>
            <a href="/w/cpp/vector#Example">Example</a>
        </body></html>"##;
        assert_eq!(links(html), vec!["https://example.com/w/cpp/vector"]);
    }

    #[test]
    fn test_extract_canonical_link() {
        let html = r#"<html><head><link rel="canonical" href="https://example.com/canonical" /></head><body></body></html>"#;
        assert!(links(html).contains(&"https://example.com/canonical".to_string()));
    }

    #[test]
    fn test_mixed_valid_and_invalid_links() {
        let html = r#"
            <html>
            <body>
                <a href="/valid">Valid</a>
                <a href="javascript:alert('no')">Invalid</a>
                <a href="mailto:test@example.com">Invalid</a>
                <a href="/another-valid">Valid</a>
            </body>
            </html>
        "#;
        assert_eq!(links(html).len(), 2);
    }
}

use regex::Regex;
use url::Url;

/// Compiled set of URL filters
///
/// A URL matching any filter is never followed. Filters are regular
/// expressions searched (unanchored) against the full resolved URL.
///
/// # Examples
///
/// ```
/// use refindex::url::UrlFilters;
/// use url::Url;
///
/// let filters = UrlFilters::new(&[r"\.(png|css)$".to_string()]).unwrap();
/// assert!(filters.is_filtered(&Url::parse("https://example.com/logo.png").unwrap()));
/// assert!(!filters.is_filtered(&Url::parse("https://example.com/page").unwrap()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct UrlFilters {
    patterns: Vec<Regex>,
}

impl UrlFilters {
    /// Compiles the given patterns
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if `url` matches any filter
    pub fn is_filtered(&self, url: &Url) -> bool {
        self.patterns.iter().any(|p| p.is_match(url.as_str()))
    }

    /// Number of compiled filters
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

use crate::{UrlError, UrlResult};
use url::Url;

/// Link prefixes that never point at a fetchable page
const SKIPPED_PREFIXES: &[&str] = &["#", "javascript:", "mailto:", "tel:", "data:"];

/// Parses and checks a crawl origin URL
///
/// # Examples
///
/// ```
/// use refindex::url::parse_origin;
///
/// let origin = parse_origin("https://en.cppreference.com/w/cpp#top").unwrap();
/// assert_eq!(origin.as_str(), "https://en.cppreference.com/w/cpp");
/// assert!(parse_origin("ftp://example.com/").is_err());
/// ```
pub fn parse_origin(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves a link or `Location` value against the page it came from
///
/// Returns None if the link should be excluded:
/// - fragment-only, `javascript:`, `mailto:`, `tel:`, and `data:` links
/// - links that fail to resolve
/// - non-HTTP(S) URLs after resolution
///
/// Resolution follows RFC 3986 (dot segments removed, characters outside
/// the URL grammar percent-encoded). The fragment is stripped unless
/// `keep_fragment` is set.
///
/// # Examples
///
/// ```
/// use refindex::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://en.cppreference.com/w/cpp/container/vector").unwrap();
/// let link = resolve_link(&base, "vector/at#Example", false).unwrap();
/// assert_eq!(link.as_str(), "https://en.cppreference.com/w/cpp/container/vector/at");
/// ```
pub fn resolve_link(base: &Url, href: &str, keep_fragment: bool) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    let mut resolved = base.join(href).ok()?;

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    if !keep_fragment {
        resolved.set_fragment(None);
    }

    Some(resolved)
}

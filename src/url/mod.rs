//! URL handling module for Refindex
//!
//! This module provides the follow-mode link policy, link resolution,
//! URL filters, and registrable-domain extraction.

mod domain;
mod matcher;
mod normalize;

use serde::Deserialize;
use url::Url;

// Re-export main functions
pub use domain::registrable_domain;
pub use matcher::UrlFilters;
pub use normalize::{parse_origin, resolve_link};

/// Policy restricting which discovered links may be enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FollowMode {
    /// Any host
    Any,
    /// Hosts sharing the origin's registrable domain
    SameDomain,
    /// Exactly the origin's host and port
    #[default]
    SameHost,
    /// The origin's host, and only paths below the origin's directory
    SamePath,
}

/// Follow-mode predicate bound to one crawl origin
#[derive(Debug, Clone)]
pub struct LinkPolicy {
    mode: FollowMode,
    authority: String,
    domain: String,
    dir_path: String,
}

impl LinkPolicy {
    /// Builds the policy for a crawl starting at `origin`
    ///
    /// The base directory for [`FollowMode::SamePath`] is `path_override`
    /// when given; otherwise the origin path itself if it ends with `/`,
    /// else its parent directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use refindex::url::{FollowMode, LinkPolicy};
    /// use url::Url;
    ///
    /// let origin = Url::parse("https://en.cppreference.com/w/cpp").unwrap();
    /// let policy = LinkPolicy::new(FollowMode::SamePath, &origin, Some("/w/cpp"));
    ///
    /// let inside = Url::parse("https://en.cppreference.com/w/cpp/container/vector").unwrap();
    /// let outside = Url::parse("https://en.cppreference.com/w/c").unwrap();
    /// assert!(policy.allows(&inside));
    /// assert!(!policy.allows(&outside));
    /// ```
    pub fn new(mode: FollowMode, origin: &Url, path_override: Option<&str>) -> Self {
        let authority = authority_of(origin);
        let domain = registrable_domain(origin.host_str().unwrap_or_default()).to_string();

        let dir_path = match path_override {
            Some(path) => path.to_string(),
            None => parent_dir(origin.path()),
        };

        Self {
            mode,
            authority,
            domain,
            dir_path,
        }
    }

    /// Returns the active follow mode
    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    /// Returns the directory every same-path link must live under
    pub fn dir_path(&self) -> &str {
        &self.dir_path
    }

    /// Returns true if `url` may be enqueued under this policy
    pub fn allows(&self, url: &Url) -> bool {
        match self.mode {
            FollowMode::Any => true,
            FollowMode::SameDomain => url
                .host_str()
                .map(|host| registrable_domain(host) == self.domain)
                .unwrap_or(false),
            FollowMode::SameHost => authority_of(url) == self.authority,
            FollowMode::SamePath => {
                authority_of(url) == self.authority && is_descendant(url.path(), &self.dir_path)
            }
        }
    }
}

/// Host plus explicit or default port, lowercased
fn authority_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port_or_known_default() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}

fn parent_dir(path: &str) -> String {
    if path.ends_with('/') {
        return path.to_string();
    }
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((dir, _)) => dir.to_string(),
    }
}

/// Segment-aware prefix check: `/w/cppfoo` is not below `/w/cpp`
fn is_descendant(path: &str, dir: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        return true;
    }
    path == dir
        || path
            .strip_prefix(dir)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

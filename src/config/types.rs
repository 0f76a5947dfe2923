use crate::url::FollowMode;
use serde::Deserialize;

/// Main configuration structure for Refindex
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum target depth to enqueue (0 = unbounded)
    pub max_depth: u32,

    /// Ceiling on concurrently running fetch workers
    pub max_outstanding: usize,

    /// Consecutive retry rounds without progress before giving up
    pub max_failed_retries: u32,

    /// Fixed sleep between retry rounds (milliseconds)
    pub retry_backoff_ms: u64,

    /// Per-request timeout (seconds)
    pub fetch_timeout_secs: u64,

    /// Which discovered links are eligible for enqueue
    pub follow_mode: FollowMode,

    /// Accepted Content-Type values (substring match)
    pub content_types: Vec<String>,

    /// Regex patterns; links matching any of them are never followed
    pub url_filters: Vec<String>,

    /// Keep `#fragment` on discovered links
    pub include_fragment: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 0,
            max_outstanding: 16,
            max_failed_retries: 3,
            retry_backoff_ms: 2000,
            fetch_timeout_secs: 10,
            follow_mode: FollowMode::SameHost,
            content_types: vec!["text/html".to_string()],
            url_filters: vec![r"\.(jpg|jpeg|gif|png|js|css|swf|svg)$".to_string()],
            include_fragment: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// The documentation site to index
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Origin URL the crawl starts from
    pub origin: String,

    /// Directory override for same-path following
    #[serde(default)]
    pub path: Option<String>,

    /// URLs that are fetched but never indexed
    #[serde(default)]
    pub blacklist: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite index database
    #[serde(rename = "database-path")]
    pub database_path: String,
}

//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a bounded timeout
//! - Manual redirect handling (the client never follows redirects itself)
//! - Content-Type filtering
//! - Error classification

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;

/// A fetched page
///
/// Owned by the worker that fetched it; the indexer receives its own copy.
#[derive(Debug, Clone)]
pub struct Document {
    pub url: String,
    pub status: u16,
    /// Header names are lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Document {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// An accepted document
    Document(Document),

    /// HTTP 404; expected and never retried
    NotFound,

    /// HTTP 301/302 with the raw `Location` value, if any
    Redirect { location: Option<String> },

    /// Content-Type missing or outside the accepted filter
    ContentMismatch { content_type: String },

    /// Transport error, timeout, or a non-404 HTTP error
    Failed { error: String },
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use refindex::config::UserAgentConfig;
/// use refindex::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "refindex".to_string(),
///     crawler_version: "0.1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the response
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 404 | `NotFound` |
/// | HTTP 301 / 302 | `Redirect` |
/// | Other non-2xx | `Failed` (retried next round) |
/// | Timeout / connection error | `Failed` (retried next round) |
/// | Content-Type not accepted | `ContentMismatch` |
/// | Otherwise | `Document` |
pub async fn fetch_document(client: &Client, url: &str, content_types: &[String]) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                e.to_string()
            };
            return FetchResult::Failed { error };
        }
    };

    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return FetchResult::NotFound;
    }

    if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        return FetchResult::Redirect { location };
    }

    if !status.is_success() {
        return FetchResult::Failed {
            error: format!("HTTP {}", status.as_u16()),
        };
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !accepts_content_type(&content_type, content_types) {
        return FetchResult::ContentMismatch { content_type };
    }

    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    match response.text().await {
        Ok(body) => FetchResult::Document(Document {
            url: url.to_string(),
            status: status.as_u16(),
            headers,
            body,
        }),
        Err(e) => FetchResult::Failed {
            error: format!("Failed to read body: {}", e),
        },
    }
}

/// A missing Content-Type never matches
fn accepts_content_type(content_type: &str, accepted: &[String]) -> bool {
    if content_type.is_empty() {
        return false;
    }
    let content_type = content_type.to_ascii_lowercase();
    accepted
        .iter()
        .any(|a| content_type.contains(&a.to_ascii_lowercase()))
}

//! Refindex: a documentation-site indexer
//!
//! This crate crawls a reference documentation website, extracts page titles
//! and alias keywords, builds a searchable name → location index with
//! duplicate disambiguation, and converts HTML tables into typesetting-table
//! markup.

pub mod config;
pub mod crawler;
pub mod index;
pub mod storage;
pub mod table;
pub mod url;

use thiserror::Error;

/// Main error type for Refindex operations
#[derive(Debug, Error)]
pub enum RefIndexError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Table layout error: {0}")]
    Table(#[from] table::TableError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid URL filter: {0}")]
    InvalidFilter(String),
}

/// Crawl-specific errors
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The crawl was interrupted; nothing may be persisted
    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(#[from] UrlError),

    #[error("Invalid URL filter: {0}")]
    InvalidFilter(String),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Refindex operations
pub type Result<T> = std::result::Result<T, RefIndexError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Crawler, Target};
pub use index::{IndexBuilder, PageIndexer, SearchHit};
pub use table::layout;
pub use url::{FollowMode, LinkPolicy};

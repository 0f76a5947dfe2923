//! Configuration module for Refindex
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use refindex::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("refindex.toml")).unwrap();
//! println!("Crawling {} with {} workers", config.source.origin, config.crawler.max_outstanding);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The frontier of pending, in-flight, and failed targets
//! - HTTP fetching with response classification
//! - HTML link extraction
//! - The worker pool and retry rounds

mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use coordinator::{CrawlReport, Crawler, DocumentHandler};
pub use fetcher::{build_http_client, fetch_document, Document, FetchResult};
pub use frontier::{Frontier, Target};
pub use parser::extract_links;

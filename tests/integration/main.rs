//! Integration tests for refindex
//!
//! These tests use wiremock to serve small documentation sites and drive
//! the crawler and index builder against them.

mod crawl_tests;
mod index_tests;

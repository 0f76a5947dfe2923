//! Storage traits and error types
//!
//! This module defines the trait interface for index storage backends and
//! associated error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A uniqueness constraint failed; disambiguation should have prevented it
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Literal, case-sensitive keyword match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordPattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

/// A keyword joined with the index row it resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRow {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub keyword: String,
}

/// Metadata stored alongside each committed index
#[derive(Debug, Clone)]
pub struct BuildRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_hash: String,
    pub rows: u64,
    pub keywords: u64,
}

/// Trait for index storage backends
///
/// A rebuild runs inside one transaction: `begin_rebuild` clears the
/// previous index, and nothing becomes visible until `commit`.
pub trait IndexStore {
    // ===== Transactions =====

    /// Opens the rebuild transaction and clears the index tables
    fn begin_rebuild(&mut self) -> StorageResult<()>;

    /// Commits the rebuild transaction
    fn commit(&mut self) -> StorageResult<()>;

    /// Discards the rebuild transaction; the previous index stays intact
    fn rollback(&mut self) -> StorageResult<()>;

    // ===== Rows and Keywords =====

    /// Inserts an index row
    ///
    /// # Returns
    ///
    /// * `Ok(id)` - The new row ID
    /// * `Err(StorageError::ConstraintViolation)` - Title or URL already present
    fn insert_row(&mut self, title: &str, url: &str) -> StorageResult<i64>;

    fn insert_keyword(&mut self, id: i64, keyword: &str) -> StorageResult<()>;

    /// Selects keywords matching any of `patterns`, ordered by (keyword, title)
    fn select_keywords(&self, patterns: &[KeywordPattern]) -> StorageResult<Vec<KeywordRow>>;

    /// Renames one keyword of row `id`
    ///
    /// Returns the number of keyword rows changed.
    fn update_keyword(&mut self, id: i64, old: &str, new: &str) -> StorageResult<usize>;

    /// Removes exact duplicate (id, keyword) pairs, keeping one of each
    fn delete_duplicate_keywords(&mut self) -> StorageResult<usize>;

    /// Keywords resolving to more than one distinct row, in keyword order
    fn colliding_keywords(&self) -> StorageResult<Vec<String>>;

    /// Every row carrying exactly `keyword`
    fn keyword_group(&self, keyword: &str) -> StorageResult<Vec<KeywordRow>> {
        self.select_keywords(&[KeywordPattern::Exact(keyword.to_string())])
    }

    /// Single-pattern lookup used by search
    fn search_keywords(&self, pattern: &KeywordPattern) -> StorageResult<Vec<KeywordRow>> {
        self.select_keywords(std::slice::from_ref(pattern))
    }

    // ===== Statistics =====

    fn count_rows(&self) -> StorageResult<u64>;

    fn count_keywords(&self) -> StorageResult<u64>;

    // ===== Build Metadata =====

    /// Records a build inside the current transaction
    ///
    /// Row and keyword counts are taken from the tables at call time.
    fn record_build(&mut self, started_at: DateTime<Utc>, config_hash: &str)
        -> StorageResult<i64>;

    /// The most recent committed build, if any
    fn latest_build(&self) -> StorageResult<Option<BuildRecord>>;
}

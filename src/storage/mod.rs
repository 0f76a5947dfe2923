//! Storage module for the persisted index
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Index rows and their keywords
//! - Literal keyword pattern lookup
//! - Build metadata

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{BuildRecord, IndexStore, KeywordPattern, KeywordRow, StorageError, StorageResult};

use std::path::Path;

/// Opens (creating if needed) an index database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to open or initialize the database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

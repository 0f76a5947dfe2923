//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the index database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per disambiguated page title
CREATE TABLE IF NOT EXISTS index_rows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL UNIQUE
);

-- Lookup strings resolving to an index row
CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER NOT NULL REFERENCES index_rows(id),
    keyword TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_keywords_keyword ON keywords(keyword);
CREATE INDEX IF NOT EXISTS idx_keywords_id ON keywords(id);

-- Metadata for each committed index build
CREATE TABLE IF NOT EXISTS builds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    row_count INTEGER NOT NULL,
    keyword_count INTEGER NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

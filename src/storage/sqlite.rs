//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the IndexStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    BuildRecord, IndexStore, KeywordPattern, KeywordRow, StorageError, StorageResult,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

/// SQL condition for one pattern, using `?{n}` as its parameter
///
/// `substr`/`instr` keep matching literal; LIKE would treat `_` as a wildcard.
fn pattern_condition(pattern: &KeywordPattern, n: usize) -> String {
    match pattern {
        KeywordPattern::Exact(_) => format!("k.keyword = ?{n}"),
        KeywordPattern::Prefix(_) => format!("substr(k.keyword, 1, length(?{n})) = ?{n}"),
        KeywordPattern::Suffix(_) => format!(
            "length(k.keyword) >= length(?{n}) \
             AND substr(k.keyword, length(k.keyword) - length(?{n}) + 1) = ?{n}"
        ),
        KeywordPattern::Contains(_) => format!("instr(k.keyword, ?{n}) > 0"),
    }
}

fn pattern_value(pattern: &KeywordPattern) -> &str {
    match pattern {
        KeywordPattern::Exact(p)
        | KeywordPattern::Prefix(p)
        | KeywordPattern::Suffix(p)
        | KeywordPattern::Contains(p) => p,
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Database(format!("Invalid timestamp '{}': {}", value, e)))
}

impl IndexStore for SqliteStorage {
    // ===== Transactions =====

    fn begin_rebuild(&mut self) -> StorageResult<()> {
        if self.in_transaction() {
            return Err(StorageError::Database(
                "Rebuild already in progress".to_string(),
            ));
        }

        self.conn.execute_batch(
            "
            BEGIN IMMEDIATE;
            DELETE FROM keywords;
            DELETE FROM index_rows;
        ",
        )?;
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        if !self.in_transaction() {
            return Err(StorageError::Database("No rebuild to commit".to_string()));
        }
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK;")?;
        }
        Ok(())
    }

    // ===== Rows and Keywords =====

    fn insert_row(&mut self, title: &str, url: &str) -> StorageResult<i64> {
        let result = self.conn.execute(
            "INSERT INTO index_rows (title, url) VALUES (?1, ?2)",
            params![title, url],
        );

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StorageError::ConstraintViolation(format!(
                    "index row '{}' at {}",
                    title, url
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn insert_keyword(&mut self, id: i64, keyword: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO keywords (id, keyword) VALUES (?1, ?2)",
            params![id, keyword],
        )?;
        Ok(())
    }

    fn select_keywords(&self, patterns: &[KeywordPattern]) -> StorageResult<Vec<KeywordRow>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let conditions: Vec<String> = patterns
            .iter()
            .enumerate()
            .map(|(i, p)| format!("({})", pattern_condition(p, i + 1)))
            .collect();

        let sql = format!(
            "SELECT k.id, r.title, r.url, k.keyword
             FROM keywords k JOIN index_rows r ON r.id = k.id
             WHERE {}
             ORDER BY k.keyword, r.title",
            conditions.join(" OR ")
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(patterns.iter().map(pattern_value)), |row| {
                Ok(KeywordRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    url: row.get(2)?,
                    keyword: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn update_keyword(&mut self, id: i64, old: &str, new: &str) -> StorageResult<usize> {
        let changed = self.conn.execute(
            "UPDATE keywords SET keyword = ?3 WHERE id = ?1 AND keyword = ?2",
            params![id, old, new],
        )?;
        Ok(changed)
    }

    fn delete_duplicate_keywords(&mut self) -> StorageResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM keywords WHERE rowid NOT IN (
                SELECT MIN(rowid) FROM keywords GROUP BY id, keyword
            )",
            [],
        )?;
        Ok(deleted)
    }

    fn colliding_keywords(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT keyword FROM keywords
             GROUP BY keyword
             HAVING COUNT(DISTINCT id) > 1
             ORDER BY keyword",
        )?;

        let keywords = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(keywords)
    }

    // ===== Statistics =====

    fn count_rows(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM index_rows", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_keywords(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM keywords", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Build Metadata =====

    fn record_build(
        &mut self,
        started_at: DateTime<Utc>,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let rows = self.count_rows()? as i64;
        let keywords = self.count_keywords()? as i64;
        let finished_at = Utc::now();

        self.conn.execute(
            "INSERT INTO builds (started_at, finished_at, config_hash, row_count, keyword_count)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                started_at.to_rfc3339(),
                finished_at.to_rfc3339(),
                config_hash,
                rows,
                keywords
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn latest_build(&self) -> StorageResult<Option<BuildRecord>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, row_count, keyword_count
                 FROM builds ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                },
            )
            .optional()?;

        raw.map(|(id, started, finished, config_hash, rows, keywords)| {
            Ok(BuildRecord {
                id,
                started_at: parse_timestamp(&started)?,
                finished_at: parse_timestamp(&finished)?,
                config_hash,
                rows: rows as u64,
                keywords: keywords as u64,
            })
        })
        .transpose()
    }
}

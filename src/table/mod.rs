//! HTML table to typesetting-table conversion
//!
//! [`tree`] turns a fragment into a bounded-depth tag tree; [`layout`]
//! walks each table and emits `tbl` format and data lines.

pub mod layout;
pub mod tree;

pub use layout::{layout, layout_table, TableLayout};
pub use tree::{parse_fragment, strip_tags, TableNode, Tag, MAX_DEPTH};

use thiserror::Error;

/// Structural failures while converting a table fragment
#[derive(Debug, Error)]
pub enum TableError {
    #[error("No table found in fragment")]
    MissingTable,

    #[error("Markup nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("Invalid span attribute: {0}")]
    InvalidSpan(String),
}

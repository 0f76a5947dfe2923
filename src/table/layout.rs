//! Typesetting-table layout for parsed table trees
//!
//! A table renders as a `tbl` block: one format line per row (column
//! descriptors, the last line closed by `.`) followed by one data line per
//! row with cells separated by `|`.

use crate::table::tree::{parse_fragment, TableNode, Tag};
use crate::table::TableError;
use std::collections::BTreeMap;

const TABLE_HEADER: &str = ".TS\nallbox tab(|);\n";
const TABLE_FOOTER: &str = ".TE\n.sp\n.sp\n";

/// Format and data lines of one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableLayout {
    /// Column descriptors per row, e.g. `["c s", "l lx"]`
    pub format: Vec<String>,
    /// Cell stream per row, cells joined by `|`
    pub body: Vec<String>,
}

impl TableLayout {
    pub fn render(&self) -> String {
        let mut out = String::from(TABLE_HEADER);
        let last = self.format.len().saturating_sub(1);
        for (i, row) in self.format.iter().enumerate() {
            out.push_str(row);
            if i == last {
                out.push('.');
            }
            out.push('\n');
        }
        for row in &self.body {
            out.push_str(row);
            out.push('\n');
        }
        out.push_str(TABLE_FOOTER);
        out
    }
}

/// Converts an HTML fragment into `tbl` markup
///
/// Every table in the fragment is rendered in document order. Tables
/// without any rows are skipped.
///
/// # Errors
///
/// - `TableError::MissingTable` if the fragment holds no table with rows
/// - `TableError::TooDeep` if markup nests beyond the parser's bound
/// - `TableError::InvalidSpan` for a non-numeric or oversized
///   `rowspan`/`colspan`
///
/// # Example
///
/// ```
/// let markup = refindex::table::layout(
///     "<table><tr><th>Name</th><th>Value</th></tr><tr><td>a</td><td>1</td></tr></table>",
/// )
/// .unwrap();
/// assert!(markup.starts_with(".TS\nallbox tab(|);\nc cx\nl lx.\n"));
/// ```
pub fn layout(fragment: &str) -> Result<String, TableError> {
    let nodes = parse_fragment(fragment)?;

    let mut tables = Vec::new();
    collect_tables(&nodes, &mut tables);

    let mut out = String::new();
    for table in tables {
        let table_layout = layout_table(table)?;
        if table_layout.format.is_empty() {
            continue;
        }
        out.push_str(&table_layout.render());
    }

    if out.is_empty() {
        return Err(TableError::MissingTable);
    }
    Ok(out)
}

fn collect_tables<'a>(nodes: &'a [TableNode], tables: &mut Vec<&'a TableNode>) {
    for node in nodes {
        if node.tag == Tag::Table {
            tables.push(node);
        } else {
            collect_tables(&node.children, tables);
        }
    }
}

fn collect_rows<'a>(nodes: &'a [TableNode], rows: &mut Vec<&'a TableNode>) {
    for node in nodes {
        match node.tag {
            Tag::Tr => rows.push(node),
            // cells outside a row and nested tables are not part of the grid
            Tag::Th | Tag::Td | Tag::Table => {}
            Tag::Other(_) => collect_rows(&node.children, rows),
        }
    }
}

/// Largest accepted `colspan`
pub const MAX_COLSPAN: usize = 1000;
/// Largest accepted `rowspan`
pub const MAX_ROWSPAN: usize = 65534;

fn span(cell: &TableNode, name: &str, limit: usize) -> Result<usize, TableError> {
    let Some(raw) = cell.attribute(name) else {
        return Ok(1);
    };
    let invalid = || TableError::InvalidSpan(format!("{}=\"{}\"", name, raw));

    let n = raw.trim().parse::<usize>().map_err(|_| invalid())?;
    if n > limit {
        return Err(invalid());
    }
    Ok(n.max(1))
}

fn colspan(cell: &TableNode) -> Result<usize, TableError> {
    span(cell, "colspan", MAX_COLSPAN)
}

fn rowspan(cell: &TableNode) -> Result<usize, TableError> {
    span(cell, "rowspan", MAX_ROWSPAN)
}

fn cells(row: &TableNode) -> impl Iterator<Item = &TableNode> {
    row.children.iter().filter(|c| c.tag.is_cell())
}

/// Column count of a row, counting colspans
fn row_width(row: &TableNode) -> Result<usize, TableError> {
    cells(row).try_fold(0usize, |width, cell| {
        width
            .checked_add(colspan(cell)?)
            .ok_or_else(|| TableError::InvalidSpan("row too wide".to_string()))
    })
}

/// Whether the cell at `index` gets expansion for a table `width` wide
fn extends(width: usize, index: usize) -> bool {
    if width == 3 {
        index == 1
    } else {
        width < 5 && index + 1 == width
    }
}

fn descriptor(cell: &TableNode, width: usize, index: usize) -> String {
    let mut descriptor = String::from(if cell.tag == Tag::Th { "c" } else { "l" });
    if extends(width, index) {
        descriptor.push('x');
    }
    descriptor
}

fn cell_data(cell: &TableNode) -> String {
    format!("T{{\n{}\nT}}", cell.text)
}

/// Lays out one `table` node
///
/// The column count comes from the first row. Row spans are tracked per
/// column across rows; within a row, pending spans and real cells are
/// consumed column by column.
pub fn layout_table(table: &TableNode) -> Result<TableLayout, TableError> {
    let mut rows = Vec::new();
    collect_rows(&table.children, &mut rows);

    let Some(first) = rows.first() else {
        return Ok(TableLayout::default());
    };
    let width = row_width(first)?;

    // column -> remaining rows covered by a vertical span
    let mut pending: BTreeMap<usize, usize> = BTreeMap::new();
    let mut layout = TableLayout::default();

    for row in rows {
        let spans_active = !pending.is_empty();
        let mut children = cells(row);
        let mut descriptors = Vec::new();
        let mut data = Vec::new();
        let mut column = 0;

        loop {
            if let Some(remaining) = pending.get_mut(&column) {
                descriptors.push("^".to_string());
                data.push("\\^".to_string());
                *remaining -= 1;
                if *remaining == 0 {
                    pending.remove(&column);
                }
                column += 1;
                continue;
            }

            let padding;
            let cell = match children.next() {
                Some(cell) => cell,
                None if spans_active
                    && (column < width || pending.range(column..).next().is_some()) =>
                {
                    padding = TableNode::empty_cell();
                    &padding
                }
                None => break,
            };

            let cols = colspan(cell)?;
            let rows_below = rowspan(cell)? - 1;

            descriptors.push(descriptor(cell, width, column));
            descriptors.extend(std::iter::repeat("s".to_string()).take(cols - 1));
            data.push(cell_data(cell));

            if rows_below > 0 {
                for covered in column..column + cols {
                    pending.insert(covered, rows_below);
                }
            }
            column += cols;
        }

        if descriptors.is_empty() {
            continue;
        }
        layout.format.push(descriptors.join(" "));
        layout.body.push(data.join("|"));
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_counts(table: &TableLayout) -> Vec<usize> {
        table
            .format
            .iter()
            .map(|row| row.split_whitespace().count())
            .collect()
    }

    fn layout_of(fragment: &str) -> TableLayout {
        let nodes = parse_fragment(fragment).unwrap();
        layout_table(&nodes[0]).unwrap()
    }

    #[test]
    fn test_rowspan_continuation() {
        let table = layout_of(
            "<table>\
               <tr><td rowspan=\"2\">a</td><td>b</td></tr>\
               <tr><td>c</td></tr>\
             </table>",
        );

        assert_eq!(table.format, vec!["l lx", "^ lx"]);
        assert_eq!(table.body, vec!["T{\na\nT}|T{\nb\nT}", "\\^|T{\nc\nT}"]);

        let counts = column_counts(&table);
        assert_eq!(counts[0], counts[1]);
        let second: Vec<_> = table.format[1].split_whitespace().collect();
        assert_eq!(second.iter().filter(|d| **d == "^").count(), 1);
        assert_eq!(second[0], "^");
    }

    #[test]
    fn test_colspan_placeholders() {
        let table = layout_of(
            "<table>\
               <tr><th colspan='2'>Header</th></tr>\
               <tr><td>a</td><td>b</td></tr>\
             </table>",
        );
        assert_eq!(table.format, vec!["c s", "l lx"]);
        assert_eq!(table.body[0], "T{\nHeader\nT}");
    }

    #[test]
    fn test_expansion_heuristic() {
        assert!(extends(1, 0));
        assert!(extends(3, 1));
        assert!(!extends(3, 2));
        assert!(extends(4, 3));
        assert!(!extends(4, 2));
        assert!(!extends(5, 4));
    }

    #[test]
    fn test_short_row_padded_under_rowspan() {
        let table = layout_of(
            "<table>\
               <tr><td>a</td><td rowspan=2>b</td></tr>\
               <tr></tr>\
             </table>",
        );
        assert_eq!(table.format, vec!["l lx", "l ^"]);
        assert_eq!(table.body[1], "T{\n\nT}|\\^");
    }

    #[test]
    fn test_compound_row_and_column_span() {
        let table = layout_of(
            "<table>\
               <tr><td>x</td><td>y</td><td>z</td></tr>\
               <tr><td colspan=2 rowspan=2>big</td><td>1</td></tr>\
               <tr><td>2</td></tr>\
             </table>",
        );
        assert_eq!(table.format, vec!["l lx l", "l s l", "^ ^ l"]);
        assert_eq!(column_counts(&table), vec![3, 3, 3]);
        assert_eq!(table.body[2], "\\^|\\^|T{\n2\nT}");
    }

    #[test]
    fn test_sections_flattened() {
        let table = layout_of(
            "<table><thead><tr><th>k</th></tr></thead>\
             <tbody><tr><td>v</td></tr></tbody></table>",
        );
        assert_eq!(table.format, vec!["cx", "lx"]);
    }

    #[test]
    fn test_render_wraps_block() {
        let markup = layout("<div><table><tr><td>only</td></tr></table></div>").unwrap();
        assert_eq!(
            markup,
            ".TS\nallbox tab(|);\nlx.\nT{\nonly\nT}\n.TE\n.sp\n.sp\n"
        );
    }

    #[test]
    fn test_missing_table() {
        assert!(matches!(layout("<p>text</p>"), Err(TableError::MissingTable)));
        assert!(matches!(layout("<table></table>"), Err(TableError::MissingTable)));
    }

    #[test]
    fn test_oversized_span_rejected() {
        let err = layout("<table><tr><td colspan='18446744073709551615'>x</td><td>y</td></tr></table>")
            .unwrap_err();
        assert!(matches!(err, TableError::InvalidSpan(_)));

        let err = layout("<table><tr><td rowspan='70000'>x</td></tr></table>").unwrap_err();
        assert!(matches!(err, TableError::InvalidSpan(_)));

        let widest = format!("<table><tr><td colspan='{}'>x</td></tr></table>", MAX_COLSPAN);
        assert!(layout(&widest).is_ok());
    }

    #[test]
    fn test_invalid_span() {
        let err = layout("<table><tr><td colspan='wide'>x</td></tr></table>").unwrap_err();
        assert!(matches!(err, TableError::InvalidSpan(_)));
    }
}

//! Tag-tree micro-parser for table fragments
//!
//! Recognizes `<name attrs>body</name>` pairs non-greedily: an element ends
//! at the first closing tag with its name, so same-name nesting is not
//! supported. Tags without a closing partner are skipped and their content
//! scanned as plain text. `th`/`td` cells are leaves holding their
//! tag-stripped text.

use crate::table::TableError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Nesting bound for element construction and tag stripping
pub const MAX_DEPTH: usize = 32;

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)\s*=\s*(?:"((?:\\.|[^"\\])*)"|'((?:\\.|[^'\\])*)'|([^\s"'>]+))"#)
        .expect("ATTRIBUTE: hardcoded regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Table,
    Tr,
    Th,
    Td,
    Other(String),
}

impl Tag {
    fn from_name(name: &str) -> Self {
        match name {
            "table" => Self::Table,
            "tr" => Self::Tr,
            "th" => Self::Th,
            "td" => Self::Td,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_cell(&self) -> bool {
        matches!(self, Self::Th | Self::Td)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<TableNode>,
    /// Cell text; empty for non-cell nodes
    pub text: String,
}

impl TableNode {
    /// An empty data cell, used to pad short rows
    pub fn empty_cell() -> Self {
        Self {
            tag: Tag::Td,
            attributes: HashMap::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// One element match: name, raw attribute text, body, and the byte offset
/// just past the closing tag
struct ElementMatch<'a> {
    name: String,
    attrs: &'a str,
    body: &'a str,
    end: usize,
}

/// Tries to match an element whose `<` is at `start`
fn match_element(input: &str, start: usize) -> Option<ElementMatch<'_>> {
    let rest = &input[start + 1..];
    let trimmed = rest.trim_start();
    let name_offset = start + 1 + (rest.len() - trimmed.len());

    let first = trimmed.chars().next()?;
    if !first.is_alphabetic() {
        return None;
    }
    let name_len = trimmed
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(trimmed.len(), |(i, _)| i);
    let name = trimmed[..name_len].to_ascii_lowercase();

    let attrs_start = name_offset + name_len;
    let open_end = attrs_start + input[attrs_start..].find('>')?;
    let body_start = open_end + 1;

    let (close_start, close_end) = find_closing(input, body_start, &name)?;

    Some(ElementMatch {
        name,
        attrs: &input[attrs_start..open_end],
        body: &input[body_start..close_start],
        end: close_end,
    })
}

/// Finds the first `<\s*/name...>` at or after `from`
fn find_closing(input: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let mut search = from;
    while let Some(offset) = input[search..].find('<') {
        let open = search + offset;
        let after = input[open + 1..].trim_start();
        if let Some(tail) = after.strip_prefix('/') {
            let tail = tail.trim_start();
            if tail
                .get(..name.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(name))
            {
                let tail_offset = input.len() - tail.len();
                let close = tail_offset + input[tail_offset..].find('>')?;
                return Some((open, close + 1));
            }
        }
        search = open + 1;
    }
    None
}

/// Splits input into text runs and matched elements
enum Segment<'a> {
    Text(&'a str),
    Element(ElementMatch<'a>),
}

fn scan(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(offset) = input[pos..].find('<') {
        let open = pos + offset;
        match match_element(input, open) {
            Some(element) => {
                if open > text_start {
                    segments.push(Segment::Text(&input[text_start..open]));
                }
                pos = element.end;
                text_start = element.end;
                segments.push(Segment::Element(element));
            }
            None => pos = open + 1,
        }
    }

    if text_start < input.len() {
        segments.push(Segment::Text(&input[text_start..]));
    }
    segments
}

fn parse_attributes(raw: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(raw)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (caps[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}

/// Replaces every matched element by its (recursively stripped) body
///
/// Unmatched tags such as `<br>` are kept verbatim.
pub fn strip_tags(html: &str) -> Result<String, TableError> {
    strip_tags_at(html, 0)
}

fn strip_tags_at(html: &str, depth: usize) -> Result<String, TableError> {
    if depth > MAX_DEPTH {
        return Err(TableError::TooDeep { limit: MAX_DEPTH });
    }

    let mut out = String::with_capacity(html.len());
    for segment in scan(html) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Element(element) => out.push_str(&strip_tags_at(element.body, depth + 1)?),
        }
    }
    Ok(out)
}

/// Parses a fragment into its top-level element nodes
///
/// # Errors
///
/// `TableError::TooDeep` if elements nest deeper than [`MAX_DEPTH`].
pub fn parse_fragment(html: &str) -> Result<Vec<TableNode>, TableError> {
    parse_nodes(html, 0)
}

fn parse_nodes(html: &str, depth: usize) -> Result<Vec<TableNode>, TableError> {
    if depth > MAX_DEPTH {
        return Err(TableError::TooDeep { limit: MAX_DEPTH });
    }

    let mut nodes = Vec::new();
    for segment in scan(html) {
        let Segment::Element(element) = segment else {
            continue;
        };

        let tag = Tag::from_name(&element.name);
        let attributes = parse_attributes(element.attrs);
        let node = if tag.is_cell() {
            TableNode {
                tag,
                attributes,
                children: Vec::new(),
                text: strip_tags_at(element.body, depth + 1)?.trim().to_string(),
            }
        } else {
            TableNode {
                tag,
                attributes,
                children: parse_nodes(element.body, depth + 1)?,
                text: String::new(),
            }
        };
        nodes.push(node);
    }
    Ok(nodes)
}

//! Compound title splitting
//!
//! A page title may enumerate several overloaded symbols, e.g.
//! `operator==,!=,<,<=(std::vector)`. Each name gets its own keyword, names
//! without their own qualifier inherit the first name's, and the trailing
//! parenthesized disambiguator is re-appended to every name unless the
//! names already carry their own parameter lists.

use regex::Regex;
use std::sync::LazyLock;

/// Template argument lists directly attached to an identifier
static TEMPLATE_ARGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w) ?<[^<>=]*>").expect("TEMPLATE_ARGS: hardcoded regex is valid")
});

/// Removes `<...>` template arguments, innermost first
///
/// Only a `<` that follows an identifier character opens an argument list,
/// so operator names such as `operator<` and `operator<=>` survive.
pub fn strip_template_args(title: &str) -> String {
    let mut current = title.to_string();
    loop {
        let next = TEMPLATE_ARGS.replace_all(&current, "$1").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Splits a trailing `(...)` disambiguator off the title
///
/// The disambiguator must be non-empty and contain no `)`, so a bare
/// `operator()` keeps its parentheses.
fn split_postfix(title: &str) -> (&str, &str) {
    let Some(body) = title.strip_suffix(')') else {
        return (title, "");
    };

    let search_from = body.rfind(')').map_or(0, |i| i + 1);
    match body[search_from..].find('(') {
        Some(offset) => {
            let open = search_from + offset;
            if open + 1 == body.len() {
                (title, "")
            } else {
                (&title[..open], &title[open..])
            }
        }
        None => (title, ""),
    }
}

/// Splits on commas outside parentheses
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

/// Qualifying prefix of a name: everything through the last `::`, extended
/// by a directly following `operator` token
///
/// # Examples
///
/// ```
/// use refindex::index::qualifier;
///
/// assert_eq!(qualifier("std::vector::at"), "std::vector::");
/// assert_eq!(qualifier("std::rel_ops::operator!="), "std::rel_ops::operator");
/// assert_eq!(qualifier("operator=="), "operator");
/// assert_eq!(qualifier("!="), "");
/// ```
pub fn qualifier(name: &str) -> &str {
    let scope_end = name.find('(').unwrap_or(name.len());
    let head = match name[..scope_end].rfind("::") {
        Some(i) => i + 2,
        None => 0,
    };

    if name[head..].starts_with("operator") {
        &name[..head + "operator".len()]
    } else {
        &name[..head]
    }
}

/// Splits a page title into its primary keywords
///
/// # Examples
///
/// ```
/// use refindex::index::split_title;
///
/// assert_eq!(
///     split_title("std::rel_ops::operator!=,>"),
///     vec!["std::rel_ops::operator!=", "std::rel_ops::operator>"]
/// );
/// ```
pub fn split_title(title: &str) -> Vec<String> {
    let stripped = strip_template_args(title);
    let full = stripped.trim();
    let (mut body, mut postfix) = split_postfix(full);

    // a trailing group belongs to the last name when earlier names carry their own
    let parts = split_top_level(body);
    if parts[..parts.len() - 1]
        .iter()
        .any(|part| part.trim_end().ends_with(')'))
    {
        body = full;
        postfix = "";
    }

    let names: Vec<&str> = split_top_level(body)
        .into_iter()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();

    let Some(first) = names.first() else {
        return Vec::new();
    };
    let shared = qualifier(first);

    names
        .iter()
        .map(|name| {
            let own = qualifier(name);
            let bare_operator = own == "operator" && shared.ends_with("::operator");
            if own.is_empty() || bare_operator {
                format!("{}{}{}", shared, &name[own.len()..], postfix)
            } else {
                format!("{}{}", name, postfix)
            }
        })
        .collect()
}

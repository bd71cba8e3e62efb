//! Key-path normalization and nested table navigation.
//!
//! Keys are dot-separated and case-insensitive: `Database.Host`,
//! ` database..host ` and `database.host` all address the same value.

use crate::value::{Table, Value};

/// Path separator between key segments.
pub const KEY_DELIMITER: char = '.';

/// Lowercase, trim, and drop empty segments.
pub fn normalize(key: &str) -> String {
    segments(key).join(".")
}

/// Normalized segments of a key.
pub fn segments(key: &str) -> Vec<String> {
    key.split(KEY_DELIMITER)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Outcome of walking a path through one layer.
#[derive(Debug, PartialEq)]
pub(crate) enum Search<'a> {
    Found(&'a Value),
    /// A non-map value sits on the path above the key.
    Shadowed,
    Missing,
}

/// Walk `path` through a nested table.
pub(crate) fn search<'a>(table: &'a Table, path: &[String]) -> Search<'a> {
    let Some((last, parents)) = path.split_last() else {
        return Search::Missing;
    };
    let mut current = table;
    for segment in parents {
        match current.get(segment) {
            Some(Value::Map(child)) => current = child,
            Some(Value::Nil) | None => return Search::Missing,
            Some(_) => return Search::Shadowed,
        }
    }
    match current.get(last) {
        Some(Value::Nil) | None => Search::Missing,
        Some(value) => Search::Found(value),
    }
}

/// Insert `value` at `path`, replacing any non-map parent on the way.
pub(crate) fn insert(table: &mut Table, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Map(Table::new()));
        if !matches!(entry, Value::Map(_)) {
            *entry = Value::Map(Table::new());
        }
        match entry {
            Value::Map(child) => current = child,
            _ => return,
        }
    }
    current.insert(last.clone(), value);
}

/// Remove the value at `path`, returning it.
pub(crate) fn remove(table: &mut Table, path: &[String]) -> Option<Value> {
    let (last, parents) = path.split_last()?;
    let mut current = table;
    for segment in parents {
        match current.get_mut(segment) {
            Some(Value::Map(child)) => current = child,
            _ => return None,
        }
    }
    current.remove(last)
}

/// Collect dotted leaf keys. Empty maps count as leaves.
pub(crate) fn flatten_keys(table: &Table, prefix: &str, out: &mut Vec<String>) {
    for (k, v) in table {
        let full = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            Value::Map(child) if !child.is_empty() => flatten_keys(child, &full, out),
            Value::Nil => {}
            _ => out.push(full),
        }
    }
}

//! Deep merge of value trees across layers.
//!
//! Implements field-by-field merging where higher layer values override lower
//! layer values. Lists are replaced entirely, not concatenated.

use crate::value::{Table, Value};

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Maps are merged recursively: keys in overlay override keys in base
/// - Lists and scalars are replaced entirely
/// - If overlay is `Nil`, the base value is preserved (nil means "not specified")
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Map(base_map), Value::Map(overlay_map)) => {
            Value::Map(merge_tables(base_map, overlay_map))
        }
        (base, Value::Nil) => base,
        (_, overlay) => overlay,
    }
}

/// Merge two tables key by key.
pub fn merge_tables(mut base: Table, overlay: Table) -> Table {
    for (key, overlay_value) in overlay {
        let merged = match base.remove(&key) {
            Some(base_value) => deep_merge(base_value, overlay_value),
            None => overlay_value,
        };
        base.insert(key, merged);
    }
    base
}

/// Merge tables in order, with later tables taking precedence.
pub fn merge_all(tables: impl IntoIterator<Item = Table>) -> Table {
    tables.into_iter().fold(Table::new(), merge_tables)
}

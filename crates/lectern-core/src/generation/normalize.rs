//! Locate the item list inside whatever shape the model returned.

use serde_json::Value;

/// Deepest object nesting searched for an array.
pub const MAX_NORMALIZE_DEPTH: usize = 32;

/// Return the first array reachable from `raw`.
///
/// An array is returned as-is. Otherwise object keys are visited in order;
/// an array value wins immediately, an object value is searched recursively
/// before its siblings. Anything else, or no array at all, yields an empty
/// list.
pub fn normalize(raw: Value) -> Vec<Value> {
    match raw {
        Value::Array(items) => items,
        other => find_array(other, 0).unwrap_or_default(),
    }
}

fn find_array(value: Value, depth: usize) -> Option<Vec<Value>> {
    let Value::Object(map) = value else {
        return None;
    };
    if depth >= MAX_NORMALIZE_DEPTH {
        return None;
    }

    for (_, child) in map {
        match child {
            Value::Array(items) => return Some(items),
            Value::Object(_) => {
                if let Some(items) = find_array(child, depth + 1) {
                    return Some(items);
                }
            }
            _ => {}
        }
    }
    None
}

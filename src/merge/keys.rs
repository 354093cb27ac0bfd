//! Key paths inside structured documents
//!
//! A key path is the dot-joined chain of object keys from the document root
//! (`mcp.server1`). A literal dot inside a key is written as `\.`. Arrays are
//! opaque leaves: a path never descends into an array.

use serde_json::{Map, Value};

use super::MergeStrategy;

/// Split a dot-joined key path into its segments
pub fn split_key(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                current.push('.');
                chars.next();
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Join segments into a key path, escaping literal dots
pub fn join_key<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref().replace('.', "\\."))
        .collect::<Vec<_>>()
        .join(".")
}

/// Whether two key paths address overlapping subtrees (equal, or one contains the other)
pub fn keys_overlap(a: &str, b: &str) -> bool {
    let a = split_key(a);
    let b = split_key(b);
    let shared = a.len().min(b.len());
    a[..shared] == b[..shared]
}

/// Compute the key paths a contribution owns once merged with `strategy`.
///
/// With `embed`, every top-level key of the embedded content is owned below
/// the embed key (an empty embedded object owns nothing). Otherwise shallow merges own top-level keys and deep merges
/// own every leaf path.
pub fn owned_keys(contribution: &Value, strategy: MergeStrategy, embed: Option<&str>) -> Vec<String> {
    if let Some(embed) = embed {
        let prefix = split_key(embed);
        return match get_path(contribution, &prefix) {
            Some(Value::Object(inner)) => inner
                .keys()
                .map(|k| {
                    let mut segments = prefix.clone();
                    segments.push(k.clone());
                    join_key(&segments)
                })
                .collect(),
            Some(_) => vec![join_key(&prefix)],
            None => Vec::new(),
        };
    }

    let Value::Object(map) = contribution else {
        return Vec::new();
    };

    match strategy {
        MergeStrategy::Shallow => map.keys().map(|k| join_key(&[k])).collect(),
        MergeStrategy::Deep => {
            let mut keys = Vec::new();
            collect_leaf_paths(map, &mut Vec::new(), &mut keys);
            keys
        }
        MergeStrategy::Replace | MergeStrategy::Composite => Vec::new(),
    }
}

fn collect_leaf_paths(map: &Map<String, Value>, prefix: &mut Vec<String>, out: &mut Vec<String>) {
    for (key, value) in map {
        prefix.push(key.clone());
        match value {
            Value::Object(child) if !child.is_empty() => collect_leaf_paths(child, prefix, out),
            _ => out.push(join_key(prefix)),
        }
        prefix.pop();
    }
}

/// Look up the value at a path of segments
pub fn get_path<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// Rebuild a document holding only the given key paths.
///
/// Each present key is copied with its full path re-created from the root;
/// absent keys are skipped.
pub fn extract_keys(document: &Value, keys: &[String]) -> Value {
    let mut out = Value::Object(Map::new());
    for key in keys {
        let segments = split_key(key);
        if let Some(found) = get_path(document, &segments) {
            insert_path(&mut out, &segments, found.clone());
        }
    }
    out
}

/// Insert `value` at `segments`, creating (or replacing non-object) ancestors
pub fn insert_path(document: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *document = value;
        return;
    };

    let mut current = document;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.clone(), value);
    }
}

/// Remove the subtree at `segments`, then prune every ancestor the removal left empty.
///
/// Returns whether anything was removed. Removing an absent key is a no-op.
pub fn remove_path(document: &mut Value, segments: &[String]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };
    let Value::Object(map) = document else {
        return false;
    };

    if rest.is_empty() {
        return map.shift_remove(first).is_some();
    }

    let Some(child) = map.get_mut(first) else {
        return false;
    };
    let removed = remove_path(child, rest);
    if removed && is_empty_container(child) {
        map.shift_remove(first);
    }
    removed
}

/// Remove every key path; returns how many were actually present
pub fn delete_keys(document: &mut Value, keys: &[String]) -> usize {
    keys.iter()
        .filter(|key| remove_path(document, &split_key(key)))
        .count()
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Whether a document has no content worth keeping on disk.
///
/// True for `null`, an object without keys, or an object whose values are all
/// themselves effectively empty objects or empty arrays.
pub fn is_effectively_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map
            .values()
            .all(|v| matches!(v, Value::Array(a) if a.is_empty()) || (v.is_object() && is_effectively_empty(v))),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

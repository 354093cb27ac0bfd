//! Merge strategies and the key extractor
//!
//! This module handles:
//! - The four merge strategies (replace, shallow, deep, composite)
//! - Merge-writing a package's contribution into a shared structured document
//!   while recording the key paths it owns
//! - The inverse operations: extracting a package's keys (save) and deleting
//!   them (uninstall)
//!
//! ## Shallow and deep
//!
//! ```json
//! Existing: {"a": 1, "b": {"x": 1, "y": 2}}
//! New:      {"b": {"y": 3, "z": 4}, "c": 3}
//! Shallow:  {"a": 1, "b": {"y": 3, "z": 4}, "c": 3}
//! Deep:     {"a": 1, "b": {"x": 1, "y": 3, "z": 4}, "c": 3}
//! ```
//!
//! Arrays and scalars are replaced wholesale by both strategies.

pub mod composite;
pub mod document;
pub mod keys;

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OpkgError, Result, flow as flow_error, fs as fs_error};

pub use document::Format;

/// Merge strategy for combining files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Replace entire file (default for most resources)
    #[default]
    #[serde(alias = "none")]
    Replace,
    /// Merge top-level keys only
    Shallow,
    /// Recursive deep merge for nested objects
    Deep,
    /// Package-labeled sections (for markdown files like AGENTS.md)
    Composite,
}

impl MergeStrategy {
    /// Whether installs with this strategy record owned key paths
    pub fn is_key_tracked(self) -> bool {
        matches!(self, Self::Shallow | Self::Deep)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Shallow => "shallow",
            Self::Deep => "deep",
            Self::Composite => "composite",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shallow merge: overwrite top-level keys
pub fn shallow_merge(target: &mut Value, source: &Value) {
    if let (Some(target_obj), Some(source_obj)) = (target.as_object_mut(), source.as_object()) {
        for (key, value) in source_obj {
            target_obj.insert(key.clone(), value.clone());
        }
    }
}

/// Deep merge: recursively merge nested objects, replace everything else
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target_obj), Value::Object(source_obj)) => {
            for (key, source_value) in source_obj {
                if let Some(target_value) = target_obj.get_mut(key) {
                    deep_merge(target_value, source_value);
                } else {
                    target_obj.insert(key.clone(), source_value.clone());
                }
            }
        }
        (target, source) => {
            *target = source.clone();
        }
    }
}

/// Outcome of merge-writing one contribution into a document
#[derive(Debug, Clone)]
pub struct MergeWrite {
    /// Serialized document after the merge
    pub content: String,
    /// Key paths the contribution owns in the document
    pub keys: Vec<String>,
    /// Whether the serialized document differs from what was there before
    pub changed: bool,
}

/// Merge a contribution into existing document text.
///
/// `stale_keys` are removed before merging; they are the keys the same package
/// owned after its previous install, so keys it no longer provides disappear.
pub fn merge_into(
    existing: Option<&str>,
    contribution: &Value,
    strategy: MergeStrategy,
    format: Format,
    embed: Option<&str>,
    stale_keys: &[String],
    path: &str,
) -> Result<MergeWrite> {
    if !contribution.is_object() {
        return Err(flow_error::execution_failed(
            path,
            format!("{strategy} merge requires an object document"),
        ));
    }

    let mut document = match existing {
        Some(text) => format.parse(text, path)?,
        None => Value::Object(serde_json::Map::new()),
    };
    if !document.is_object() {
        return Err(flow_error::parse_failed(
            path,
            format.name(),
            "top-level value is not an object",
        ));
    }

    keys::delete_keys(&mut document, stale_keys);

    match strategy {
        MergeStrategy::Shallow => shallow_merge(&mut document, contribution),
        MergeStrategy::Deep => deep_merge(&mut document, contribution),
        MergeStrategy::Replace | MergeStrategy::Composite => {
            return Err(OpkgError::NotKeyTrackable {
                path: path.to_string(),
                strategy: strategy.to_string(),
            });
        }
    }

    let content = format.serialize(&document, path)?;
    let changed = existing != Some(content.as_str());

    Ok(MergeWrite {
        content,
        keys: keys::owned_keys(contribution, strategy, embed),
        changed,
    })
}

/// What removing a package's contribution did to a target file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The file became empty and was deleted
    Deleted,
    /// Contribution removed, remaining document written back
    Rewritten,
    /// Nothing of the package was present
    Unchanged,
    /// The target file does not exist
    Missing,
}

fn read_target(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .map_err(|e| fs_error::read_failed(path, e))
}

fn document_format(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| {
        flow_error::parse_failed(
            &path.display().to_string(),
            "structured document",
            "unsupported file extension",
        )
    })
}

/// Extract the document holding only `keys` from a target file
pub fn extract_from_file(path: &Path, strategy: MergeStrategy, keys: &[String]) -> Result<Value> {
    if !strategy.is_key_tracked() {
        return Err(OpkgError::NotKeyTrackable {
            path: path.display().to_string(),
            strategy: strategy.to_string(),
        });
    }

    let format = document_format(path)?;
    let text = read_target(path)?.ok_or_else(|| fs_error::not_found(path))?;
    let document = format.parse(&text, &path.display().to_string())?;
    Ok(keys::extract_keys(&document, keys))
}

/// Delete `keys` from a target file, deleting the file when nothing remains
pub fn remove_keys_from_file(path: &Path, keys: &[String], dry_run: bool) -> Result<Removal> {
    let Some(text) = read_target(path)? else {
        return Ok(Removal::Missing);
    };
    let format = document_format(path)?;
    let path_str = path.display().to_string();
    let mut document = format.parse(&text, &path_str)?;

    if keys::delete_keys(&mut document, keys) == 0 {
        return Ok(Removal::Unchanged);
    }

    if keys::is_effectively_empty(&document) {
        if !dry_run {
            fs::remove_file(path).map_err(|e| fs_error::write_failed(path, e))?;
        }
        return Ok(Removal::Deleted);
    }

    if !dry_run {
        let content = format.serialize(&document, &path_str)?;
        fs::write(path, content).map_err(|e| fs_error::write_failed(path, e))?;
    }
    Ok(Removal::Rewritten)
}

/// Remove a package's composite section, deleting the file when it is left blank
pub fn remove_section_from_file(path: &Path, package: &str, dry_run: bool) -> Result<Removal> {
    let Some(text) = read_target(path)? else {
        return Ok(Removal::Missing);
    };
    let Some(reduced) = composite::remove_section(&text, package) else {
        return Ok(Removal::Unchanged);
    };

    if composite::is_blank(&reduced) {
        if !dry_run {
            fs::remove_file(path).map_err(|e| fs_error::write_failed(path, e))?;
        }
        return Ok(Removal::Deleted);
    }

    if !dry_run {
        fs::write(path, reduced).map_err(|e| fs_error::write_failed(path, e))?;
    }
    Ok(Removal::Rewritten)
}

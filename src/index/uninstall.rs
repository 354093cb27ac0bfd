//! Removing a package's contribution from the workspace

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{IndexEntry, WorkspaceIndex};
use crate::coordinator::Ownership;
use crate::error::{OpkgError, Result, fs as fs_error};
use crate::executor::ResolvedTargetMapping;
use crate::merge::{self, MergeStrategy, Removal, keys::keys_overlap};
use crate::path_utils::{from_index_path, to_index_path};
use crate::platform::PlatformRegistry;

/// What an uninstall did (or would do, on dry-run)
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UninstallReport {
    pub package: String,
    /// Files deleted
    pub removed: Vec<String>,
    /// Files that still hold other content and were rewritten
    pub rewritten: Vec<String>,
    /// Targets left alone because another package owns them
    pub kept: Vec<String>,
    /// Recorded targets that no longer exist
    pub missing: Vec<String>,
    /// Empty directories pruned below platform roots
    pub pruned: Vec<String>,
}

impl UninstallReport {
    fn note(&mut self, target: &str, removal: Removal) {
        let list = match removal {
            Removal::Deleted => &mut self.removed,
            Removal::Rewritten => &mut self.rewritten,
            Removal::Missing => &mut self.missing,
            Removal::Unchanged => return,
        };
        list.push(target.to_string());
    }
}

/// Undo one recorded mapping of `name`. `None` means another package owns
/// the target and it was left alone.
fn clean_mapping(
    mapping: &ResolvedTargetMapping,
    name: &str,
    ownership: &Ownership,
    workspace_root: &Path,
    dry_run: bool,
) -> Result<Option<Removal>> {
    let path = from_index_path(&mapping.target, workspace_root);

    let removal = match mapping.merge {
        MergeStrategy::Replace => {
            if ownership.file_owner(&mapping.target).is_some_and(|owner| owner != name) {
                return Ok(None);
            }
            remove_file(&path, dry_run)?
        }
        MergeStrategy::Composite => merge::remove_section_from_file(&path, name, dry_run)?,
        MergeStrategy::Deep | MergeStrategy::Shallow => {
            let others = ownership.key_owners(&mapping.target);
            let keys: Vec<String> = mapping
                .keys
                .iter()
                .flatten()
                .filter(|key| {
                    !others
                        .iter()
                        .any(|(_, owned)| owned.iter().any(|other| keys_overlap(key, other)))
                })
                .cloned()
                .collect();
            merge::remove_keys_from_file(&path, &keys, dry_run)?
        }
    };

    tracing::debug!(package = name, target = %mapping.target, ?removal, dry_run, "target cleaned");
    Ok(Some(removal))
}

/// Remove everything `name` installed.
///
/// Replace targets are deleted unless another package owns them now,
/// composite sections and recorded keys are removed, and directories
/// emptied by a deletion are pruned up to the platform root. The package's
/// index entry is dropped unless `dry_run`; saving the index is up to the
/// caller.
pub fn uninstall(
    index: &mut WorkspaceIndex,
    registry: &PlatformRegistry,
    workspace_root: &Path,
    name: &str,
    dry_run: bool,
) -> Result<UninstallReport> {
    let entry = index.get(name).ok_or_else(|| OpkgError::PackageNotInstalled {
        name: name.to_string(),
    })?;
    let ownership = index.ownership(name);
    let mut report = UninstallReport {
        package: name.to_string(),
        ..UninstallReport::default()
    };

    let mut seen = BTreeSet::new();
    let mut deleted = Vec::new();
    for mapping in entry.mappings() {
        if !seen.insert((mapping.target.clone(), mapping.merge.as_str())) {
            continue;
        }
        match clean_mapping(&mapping, name, &ownership, workspace_root, dry_run)? {
            Some(removal) => {
                if removal == Removal::Deleted {
                    deleted.push(from_index_path(&mapping.target, workspace_root));
                }
                report.note(&mapping.target, removal);
            }
            None => report.kept.push(mapping.target.clone()),
        }
    }

    if !dry_run {
        let roots = platform_roots(registry, &entry.platforms, workspace_root);
        for dir in prune_emptied(&deleted, &roots)? {
            report.pruned.push(to_index_path(&dir, workspace_root));
        }
        index.remove(name);
    }

    tracing::info!(
        package = name,
        removed = report.removed.len(),
        rewritten = report.rewritten.len(),
        kept = report.kept.len(),
        dry_run,
        "package uninstalled"
    );
    Ok(report)
}

/// Before `name`'s index entry is replaced by `next`, remove what its
/// previous install wrote that the new install no longer produces. On
/// dry-run the stale targets are reported and left in place.
pub fn remove_stale(
    index: &WorkspaceIndex,
    registry: &PlatformRegistry,
    workspace_root: &Path,
    name: &str,
    next: &IndexEntry,
    dry_run: bool,
) -> Result<Vec<String>> {
    let Some(previous) = index.get(name) else {
        return Ok(Vec::new());
    };
    let ownership = index.ownership(name);
    let current: BTreeSet<(String, &'static str)> = next
        .mappings()
        .into_iter()
        .map(|m| (m.target, m.merge.as_str()))
        .collect();

    let mut removed = Vec::new();
    let mut deleted = Vec::new();
    for mapping in previous.mappings() {
        let key = (mapping.target.clone(), mapping.merge.as_str());
        if current.contains(&key) {
            continue;
        }
        match clean_mapping(&mapping, name, &ownership, workspace_root, dry_run)? {
            Some(Removal::Deleted) => {
                deleted.push(from_index_path(&mapping.target, workspace_root));
                removed.push(mapping.target.clone());
            }
            Some(Removal::Rewritten) => removed.push(mapping.target.clone()),
            _ => {}
        }
    }

    if !dry_run {
        prune_emptied(&deleted, &platform_roots(registry, &previous.platforms, workspace_root))?;
    }
    Ok(removed)
}

fn platform_roots(registry: &PlatformRegistry, platforms: &[String], workspace_root: &Path) -> Vec<PathBuf> {
    platforms
        .iter()
        .filter_map(|id| registry.get_by_id(id))
        .map(|platform| platform.directory_path(workspace_root))
        .collect()
}

fn remove_file(path: &Path, dry_run: bool) -> Result<Removal> {
    if !path.is_file() {
        return Ok(Removal::Missing);
    }
    if !dry_run {
        fs::remove_file(path).map_err(|e| fs_error::write_failed(path, e))?;
    }
    Ok(Removal::Deleted)
}

/// Remove the directories holding `deleted` files, and their ancestors,
/// while they are empty. Only directories strictly below a platform root
/// are touched.
fn prune_emptied(deleted: &[PathBuf], roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let parents: BTreeSet<&Path> = deleted.iter().filter_map(|path| path.parent()).collect();

    let mut pruned = Vec::new();
    // Deepest first, so a parent is checked after its children
    for parent in parents.into_iter().rev() {
        let Some(root) = roots.iter().find(|root| parent.starts_with(root)) else {
            continue;
        };
        let mut dir = parent;
        while dir != root.as_path() {
            if dir.is_dir() {
                let is_empty = fs::read_dir(dir)
                    .map_err(|e| fs_error::read_failed(dir, e))?
                    .next()
                    .is_none();
                if !is_empty {
                    break;
                }
                fs::remove_dir(dir).map_err(|e| fs_error::write_failed(dir, e))?;
                pruned.push(dir.to_path_buf());
            }
            let Some(up) = dir.parent() else {
                break;
            };
            dir = up;
        }
    }
    Ok(pruned)
}

//! Detecting and saving workspace edits back into package sources
//!
//! Every recorded mapping is replayed: the package source is rendered again
//! through the export flow that produced it and compared (by BLAKE3 hash)
//! with what the workspace holds now. Merge targets compare only the keys
//! the package owns, composite targets only its section.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use super::IndexEntry;
use crate::coordinator::{Coordinator, FlowFailure, PassOptions};
use crate::error::{OpkgError, Result, flow as flow_error, fs as fs_error};
use crate::executor::{self, Rendered, ResolvedTargetMapping, content::Content};
use crate::flow::{Direction, Flow, FlowContext};
use crate::hash::{canonical_hash, hash_bytes, hash_file};
use crate::merge::{self, Format, MergeStrategy, composite, keys};
use crate::package::ResolvedPackage;
use crate::path_utils::from_index_path;
use crate::pattern::{self, ResolvedPair};
use crate::platform::{Platform, PlatformRegistry};

/// Whether a recorded target still matches what the package renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeState {
    Clean,
    Modified,
    Missing,
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => f.write_str("clean"),
            Self::Modified => f.write_str("modified"),
            Self::Missing => f.write_str("missing"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingStatus {
    pub source: String,
    pub target: String,
    pub merge: MergeStrategy,
    pub platform: Option<String>,
    pub state: ChangeState,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageStatus {
    pub name: String,
    pub version: Option<String>,
    pub mappings: Vec<MappingStatus>,
}

/// A workspace target that diverged from its package source
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub source: String,
    pub target: String,
    pub merge: MergeStrategy,
    pub platform: String,
    /// Hash of the workspace side; `None` when it could not be read
    pub workspace_hash: Option<String>,
    pub package_hash: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct SaveReport {
    pub package: String,
    pub pending: Vec<PendingChange>,
    /// Package source paths written back
    pub applied: Vec<String>,
    pub failures: Vec<FlowFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Restrict to these platforms; empty means every recorded platform
    pub platforms: Vec<String>,
    /// Write pending changes back into the package
    pub apply: bool,
}

/// A recorded mapping together with the export flow that produced it
struct Replayed<'r> {
    platform: &'r Platform,
    flow: &'r Flow,
    pair: ResolvedPair,
    mapping: ResolvedTargetMapping,
    ctx: FlowContext,
}

struct Comparison {
    state: ChangeState,
    workspace_hash: Option<String>,
    package_hash: Option<String>,
}

impl Comparison {
    fn missing() -> Self {
        Self {
            state: ChangeState::Missing,
            workspace_hash: None,
            package_hash: None,
        }
    }

    fn of(workspace_hash: String, package_hash: String) -> Self {
        let state = if workspace_hash == package_hash {
            ChangeState::Clean
        } else {
            ChangeState::Modified
        };
        Self {
            state,
            workspace_hash: Some(workspace_hash),
            package_hash: Some(package_hash),
        }
    }
}

fn package_of(name: &str, entry: &IndexEntry, workspace_root: &Path) -> ResolvedPackage {
    ResolvedPackage {
        root: from_index_path(&entry.path, workspace_root),
        name: name.to_string(),
        version: entry.version.clone(),
        priority: 0,
    }
}

fn selected<'e>(entry: &'e IndexEntry, platforms: &[String]) -> impl Iterator<Item = &'e String> {
    entry
        .platforms
        .iter()
        .filter(move |id| platforms.is_empty() || platforms.contains(id))
}

/// Resolve each recorded mapping back to its export flow. Mappings no
/// selected platform reproduces are returned separately.
fn replay<'r>(
    registry: &'r PlatformRegistry,
    workspace_root: &Path,
    package: &ResolvedPackage,
    entry: &IndexEntry,
    platforms: &[String],
) -> Result<(Vec<Replayed<'r>>, Vec<ResolvedTargetMapping>)> {
    let files = package.files()?;
    let coordinator = Coordinator::new(registry, workspace_root);
    let options = PassOptions {
        variables: entry.variables.clone(),
        ..PassOptions::default()
    };

    let mut found: BTreeMap<(String, String), Replayed<'r>> = BTreeMap::new();
    let wanted: Vec<ResolvedTargetMapping> = entry.mappings();

    for id in selected(entry, platforms) {
        let Some(platform) = registry.get_by_id(id) else {
            tracing::warn!(platform = %id, "recorded platform is no longer known");
            continue;
        };
        let base = coordinator.base_context(package, platform, Direction::Install, &options);

        for flow in registry.flows(platform, Direction::Install) {
            if !flow.applies(&base) {
                continue;
            }
            let Ok(resolution) = pattern::resolve(flow, &files, &base) else {
                continue;
            };
            for pair in resolution.pairs {
                let key = (pair.source.clone(), pair.target.clone());
                if found.contains_key(&key) {
                    continue;
                }
                let Some(mapping) = wanted
                    .iter()
                    .find(|m| m.source == pair.source && m.target == pair.target)
                else {
                    continue;
                };
                let ctx = base.for_source([("name", pair.name.as_str())]);
                found.insert(
                    key,
                    Replayed {
                        platform,
                        flow,
                        mapping: mapping.clone(),
                        pair,
                        ctx,
                    },
                );
            }
        }
    }

    let mut replayed = Vec::new();
    let mut unmatched = Vec::new();
    for mapping in wanted {
        match found.remove(&(mapping.source.clone(), mapping.target.clone())) {
            Some(r) => replayed.push(r),
            None if platforms.is_empty() => unmatched.push(mapping),
            None => {}
        }
    }
    Ok((replayed, unmatched))
}

fn compare(replayed: &Replayed<'_>, workspace_root: &Path) -> Result<Comparison> {
    let path = from_index_path(&replayed.mapping.target, workspace_root);
    if !path.is_file() {
        return Ok(Comparison::missing());
    }

    match executor::render(replayed.flow, &replayed.pair, &replayed.ctx)? {
        Rendered::Bytes(bytes) => Ok(Comparison::of(hash_file(&path)?, hash_bytes(&bytes))),
        Rendered::Section(body) => {
            let text = fs::read_to_string(&path).map_err(|e| fs_error::read_failed(&path, e))?;
            match composite::read_section(&text, &replayed.ctx.package_name) {
                Some(section) => Ok(Comparison::of(
                    hash_bytes(section.as_bytes()),
                    hash_bytes(body.trim().as_bytes()),
                )),
                None => Ok(Comparison::missing()),
            }
        }
        Rendered::Document(contribution) => {
            let recorded = replayed.mapping.keys.as_deref().unwrap_or_default();
            let extracted = merge::extract_from_file(&path, replayed.mapping.merge, recorded)?;
            if !recorded.is_empty() && keys::is_effectively_empty(&extracted) {
                return Ok(Comparison::missing());
            }
            Ok(Comparison::of(
                canonical_hash(&extracted),
                canonical_hash(&keys::extract_keys(&contribution, recorded)),
            ))
        }
    }
}

fn compare_or_modified(replayed: &Replayed<'_>, workspace_root: &Path) -> Comparison {
    compare(replayed, workspace_root).unwrap_or_else(|e| {
        tracing::warn!(target = %replayed.mapping.target, "cannot compare: {e}");
        Comparison {
            state: ChangeState::Modified,
            workspace_hash: None,
            package_hash: None,
        }
    })
}

/// State of every mapping recorded for one package.
///
/// When the package source can no longer be read, only target presence is
/// checked.
pub fn status(registry: &PlatformRegistry, workspace_root: &Path, name: &str, entry: &IndexEntry) -> PackageStatus {
    let package = package_of(name, entry, workspace_root);
    let (replayed, unmatched) = match replay(registry, workspace_root, &package, entry, &[]) {
        Ok(replay) => replay,
        Err(e) => {
            tracing::warn!(package = name, "cannot read package source: {e}");
            (Vec::new(), entry.mappings())
        }
    };

    let mut mappings: Vec<MappingStatus> = replayed
        .iter()
        .map(|r| MappingStatus {
            source: r.mapping.source.clone(),
            target: r.mapping.target.clone(),
            merge: r.mapping.merge,
            platform: Some(r.platform.id.clone()),
            state: compare_or_modified(r, workspace_root).state,
        })
        .collect();

    // The package no longer renders these; only presence can be checked
    mappings.extend(unmatched.into_iter().map(|m| {
        let state = if from_index_path(&m.target, workspace_root).exists() {
            ChangeState::Modified
        } else {
            ChangeState::Missing
        };
        MappingStatus {
            source: m.source,
            target: m.target,
            merge: m.merge,
            platform: None,
            state,
        }
    }));

    PackageStatus {
        name: name.to_string(),
        version: entry.version.clone(),
        mappings,
    }
}

/// Find workspace edits to a package's targets, and optionally write them
/// back into the package sources
pub fn save(
    registry: &PlatformRegistry,
    workspace_root: &Path,
    name: &str,
    entry: &IndexEntry,
    options: &SaveOptions,
) -> Result<SaveReport> {
    let package = package_of(name, entry, workspace_root);
    let (replayed, _) = replay(registry, workspace_root, &package, entry, &options.platforms)?;
    let mut report = SaveReport {
        package: name.to_string(),
        ..SaveReport::default()
    };

    for r in &replayed {
        let comparison = compare_or_modified(r, workspace_root);
        if comparison.state != ChangeState::Modified {
            continue;
        }
        report.pending.push(PendingChange {
            source: r.mapping.source.clone(),
            target: r.mapping.target.clone(),
            merge: r.mapping.merge,
            platform: r.platform.id.clone(),
            workspace_hash: comparison.workspace_hash,
            package_hash: comparison.package_hash,
        });

        if !options.apply {
            continue;
        }
        match apply(registry, workspace_root, &package, entry, r) {
            Ok(path) => {
                tracing::info!(source = %r.mapping.source, target = %r.mapping.target, "saved workspace edits");
                report.applied.push(path);
            }
            Err(e) => {
                tracing::warn!(source = %r.mapping.source, "cannot save: {e}");
                report.failures.push(FlowFailure {
                    source: r.mapping.source.clone(),
                    target: Some(r.mapping.target.clone()),
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// Context for import flows: sources are read from the workspace and
/// targets land in the package
fn import_context(
    registry: &PlatformRegistry,
    workspace_root: &Path,
    package: &ResolvedPackage,
    entry: &IndexEntry,
    platform: &Platform,
) -> FlowContext {
    let mut ctx = FlowContext::new(&package.root, workspace_root, &platform.id, &package.name)
        .with_direction(Direction::Save)
        .with_known_platforms(registry.ids());
    ctx.package_version = package.version.clone();
    ctx.platform_aliases = platform.aliases.clone();
    ctx.variables = platform.template_variables();
    ctx.variables.extend(
        entry
            .variables
            .iter()
            .filter(|(k, _)| k.as_str() != "prefix")
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    ctx
}

fn find_import<'r>(
    registry: &'r PlatformRegistry,
    platform: &'r Platform,
    mapping: &ResolvedTargetMapping,
    ctx: &FlowContext,
) -> Option<&'r Flow> {
    let candidates = [mapping.target.clone()];
    registry
        .flows(platform, Direction::Save)
        .into_iter()
        .filter(|flow| flow.applies(ctx))
        .find(|flow| {
            pattern::resolve(flow, &candidates, ctx)
                .is_ok_and(|r| r.pairs.iter().any(|p| p.target == mapping.source))
        })
}

/// The package's part of a workspace target
fn workspace_content(mapping: &ResolvedTargetMapping, path: &Path, package: &str) -> Result<Content> {
    let target = Path::new(&mapping.target);
    match mapping.merge {
        MergeStrategy::Replace => {
            let bytes = fs::read(path).map_err(|e| fs_error::read_failed(path, e))?;
            Content::load(bytes, target)
        }
        MergeStrategy::Composite => {
            let text = fs::read_to_string(path).map_err(|e| fs_error::read_failed(path, e))?;
            let section = composite::read_section(&text, package).ok_or_else(|| fs_error::not_found(path))?;
            Content::load(format!("{section}\n").into_bytes(), target)
        }
        MergeStrategy::Deep | MergeStrategy::Shallow => {
            let keys = mapping.keys.as_deref().unwrap_or_default();
            let value = merge::extract_from_file(path, mapping.merge, keys)?;
            let format = Format::from_path(path).unwrap_or(Format::Json);
            Ok(Content::Document { value, format })
        }
    }
}

/// Map a key recorded in the target back to the package source layout
fn source_key(key: &str, export: &Flow) -> Option<String> {
    let rest = match export.embed.as_deref() {
        Some(embed) => key.strip_prefix(embed)?.strip_prefix('.')?,
        None => key,
    };
    Some(match export.extract.as_deref() {
        Some(extract) => format!("{extract}.{rest}"),
        None => rest.to_string(),
    })
}

/// Undo an export flow's `extract`/`embed` on extracted workspace keys
fn unwrap_contribution(value: Value, export: &Flow) -> Value {
    let inner = match export.embed.as_deref() {
        Some(embed) => keys::get_path(&value, &keys::split_key(embed))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        None => value,
    };
    match export.extract.as_deref() {
        Some(extract) => {
            let mut wrapped = Value::Object(Map::new());
            keys::insert_path(&mut wrapped, &keys::split_key(extract), inner);
            wrapped
        }
        None => inner,
    }
}

fn write_source(path: &Path, merge_strategy: MergeStrategy, content: &Content, stale: &[String]) -> Result<()> {
    let path_str = path.display().to_string();
    let output = match (merge_strategy, content) {
        (MergeStrategy::Deep | MergeStrategy::Shallow, Content::Document { value, .. }) => {
            let format = Format::from_path(path)
                .ok_or_else(|| flow_error::execution_failed(&path_str, "package source is not a structured document"))?;
            let existing = if path.is_file() {
                Some(fs::read_to_string(path).map_err(|e| fs_error::read_failed(path, e))?)
            } else {
                None
            };
            merge::merge_into(existing.as_deref(), value, merge_strategy, format, None, stale, &path_str)?
                .content
                .into_bytes()
        }
        (MergeStrategy::Deep | MergeStrategy::Shallow, _) => {
            return Err(flow_error::execution_failed(
                &path_str,
                format!("{merge_strategy} merge needs a structured document"),
            ));
        }
        _ => content.render(path)?,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| fs_error::write_failed(parent, e))?;
    }
    fs::write(path, output).map_err(|e| fs_error::write_failed(path, e))
}

fn apply(
    registry: &PlatformRegistry,
    workspace_root: &Path,
    package: &ResolvedPackage,
    entry: &IndexEntry,
    replayed: &Replayed<'_>,
) -> Result<String> {
    let mapping = &replayed.mapping;
    let target_path = from_index_path(&mapping.target, workspace_root);
    let source_path: PathBuf = package.root.join(&mapping.source);
    let content = workspace_content(mapping, &target_path, &package.name)?;
    let stale: Vec<String> = mapping
        .keys
        .iter()
        .flatten()
        .filter_map(|key| source_key(key, replayed.flow))
        .collect();

    let ctx = import_context(registry, workspace_root, package, entry, replayed.platform);
    if let Some(import) = find_import(registry, replayed.platform, mapping, &ctx) {
        let content = executor::transform(import, content, &ctx, &mapping.target)?;
        let strategy = if import.merge.is_key_tracked() {
            import.merge
        } else {
            MergeStrategy::Replace
        };
        write_source(&source_path, strategy, &content, &stale)?;
        return Ok(mapping.source.clone());
    }

    match (mapping.merge, content) {
        (MergeStrategy::Replace, _) if replayed.flow.is_passthrough() => {
            let bytes = fs::read(&target_path).map_err(|e| fs_error::read_failed(&target_path, e))?;
            write_source(&source_path, MergeStrategy::Replace, &Content::Binary(bytes), &[])?;
        }
        (MergeStrategy::Replace, _) => {
            return Err(flow_error::execution_failed(
                &mapping.target,
                format!("no import flow converts this target back for {}", replayed.platform.id),
            ));
        }
        (MergeStrategy::Composite, content) => {
            write_source(&source_path, MergeStrategy::Replace, &content, &[])?;
        }
        (strategy, Content::Document { value, format }) => {
            let value = unwrap_contribution(value, replayed.flow);
            write_source(&source_path, strategy, &Content::Document { value, format }, &stale)?;
        }
        (_, _) => {
            return Err(OpkgError::NotKeyTrackable {
                path: mapping.target.clone(),
                strategy: mapping.merge.to_string(),
            });
        }
    }
    Ok(mapping.source.clone())
}

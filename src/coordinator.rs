//! Execution coordinator
//!
//! Runs one platform pass for one package: every applicable flow (global
//! first, then the platform's own, by ascending priority) crossed with the
//! package files it matches. Failures are recorded and the pass continues.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use wax::{CandidatePath, Glob, Pattern};

use crate::error::{OpkgError, flow as flow_error};
use crate::executor::{self, ExecutionResult, ResolvedTargetMapping, Staged};
use crate::flow::{Direction, Flow, FlowContext, FlowSource};
use crate::merge::{MergeStrategy, keys::keys_overlap};
use crate::package::ResolvedPackage;
use crate::pattern;
use crate::platform::{Platform, PlatformRegistry};

/// Informational record of one write overriding another
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub target_path: String,
    pub winner: String,
    pub losers: Vec<String>,
    pub message: String,
}

/// A source (or flow) that failed during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowFailure {
    pub source: String,
    pub target: Option<String>,
    /// Error category, see [`OpkgError::kind`]
    pub kind: String,
    pub message: String,
}

impl FlowFailure {
    fn new(source: impl Into<String>, target: Option<String>, error: &OpkgError) -> Self {
        Self {
            source: source.into(),
            target,
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Folded outcome of one pass
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassResult {
    pub platform: String,
    pub success: bool,
    pub files_processed: usize,
    pub files_written: usize,
    /// Sources skipped by a condition or with nothing to contribute
    pub files_skipped: usize,
    pub target_paths: Vec<PathBuf>,
    pub file_mapping: BTreeMap<String, Vec<ResolvedTargetMapping>>,
    pub conflicts: Vec<Conflict>,
    pub errors: Vec<FlowFailure>,
}

impl PassResult {
    fn new(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            success: true,
            ..Self::default()
        }
    }

    fn fail(&mut self, failure: FlowFailure) {
        tracing::warn!(
            platform = %self.platform,
            source = %failure.source,
            kind = %failure.kind,
            "{}",
            failure.message
        );
        self.errors.push(failure);
    }

    fn conflict(&mut self, conflict: Conflict) {
        tracing::warn!(platform = %self.platform, target = %conflict.target_path, "{}", conflict.message);
        self.conflicts.push(conflict);
    }
}

/// What other packages (and this package's previous install) own in the
/// workspace, as recorded in the index
#[derive(Debug, Default, Clone)]
pub struct Ownership {
    files: BTreeMap<String, String>,
    keys: BTreeMap<String, Vec<(String, Vec<String>)>>,
    previous: BTreeMap<String, Vec<String>>,
}

impl Ownership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record another package as owner of a whole-file target
    pub fn claim_file(&mut self, target: impl Into<String>, package: impl Into<String>) {
        self.files.insert(target.into(), package.into());
    }

    /// Record key paths another package owns in a merge target
    pub fn claim_keys(&mut self, target: impl Into<String>, package: impl Into<String>, keys: Vec<String>) {
        self.keys
            .entry(target.into())
            .or_default()
            .push((package.into(), keys));
    }

    /// Record keys the installing package owned after its previous install
    pub fn previous_keys(&mut self, target: impl Into<String>, keys: Vec<String>) {
        self.previous.entry(target.into()).or_default().extend(keys);
    }

    pub fn file_owner(&self, target: &str) -> Option<&str> {
        self.files.get(target).map(String::as_str)
    }

    pub fn key_owners(&self, target: &str) -> &[(String, Vec<String>)] {
        self.keys.get(target).map(Vec::as_slice).unwrap_or_default()
    }

    /// Hand out the previous keys for a target once. Keys also claimed by
    /// another package are kept out so their values survive.
    pub fn take_previous_keys(&mut self, target: &str) -> Vec<String> {
        let mut keys = self.previous.remove(target).unwrap_or_default();
        let others = self.key_owners(target);
        keys.retain(|key| {
            !others
                .iter()
                .any(|(_, owned)| owned.iter().any(|other| keys_overlap(key, other)))
        });
        keys
    }
}

/// Per-invocation pass options
#[derive(Debug, Clone, Default)]
pub struct PassOptions {
    pub dry_run: bool,
    /// Only sources matching this glob are processed
    pub filter: Option<String>,
    /// Extra context variables, shadowing platform variables
    pub variables: BTreeMap<String, String>,
}

/// Drives platform passes against one workspace
pub struct Coordinator<'a> {
    registry: &'a PlatformRegistry,
    workspace_root: PathBuf,
}

fn flow_label(flow: &Flow) -> String {
    match &flow.from {
        FlowSource::One(pattern) => pattern.clone(),
        FlowSource::Many(patterns) => patterns.join(", "),
        FlowSource::Switch { switch } => format!("switch on '{}'", switch.on),
    }
}

/// Compiled `--only` filter over package-relative source paths
#[derive(Default)]
pub struct SourceFilter<'t>(Option<Glob<'t>>);

impl<'t> SourceFilter<'t> {
    pub fn new(filter: Option<&'t str>) -> Result<Self, OpkgError> {
        filter
            .map(|f| Glob::new(f).map_err(|e| flow_error::invalid_pattern(f, e)))
            .transpose()
            .map(Self)
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Always true without a filter
    pub fn matches(&self, source: &str) -> bool {
        self.0
            .as_ref()
            .is_none_or(|glob| glob.matched(&CandidatePath::from(source)).is_some())
    }
}

fn filter_files(files: Vec<String>, filter: Option<&str>) -> Result<Vec<String>, OpkgError> {
    let filter = SourceFilter::new(filter)?;
    Ok(files.into_iter().filter(|f| filter.matches(f)).collect())
}

impl<'a> Coordinator<'a> {
    pub fn new(registry: &'a PlatformRegistry, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            workspace_root: workspace_root.into(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// The pass-level context every per-source context derives from
    pub fn base_context(
        &self,
        package: &ResolvedPackage,
        platform: &Platform,
        direction: Direction,
        options: &PassOptions,
    ) -> FlowContext {
        let mut ctx = FlowContext::new(&self.workspace_root, &package.root, &platform.id, &package.name)
            .with_direction(direction)
            .with_dry_run(options.dry_run)
            .with_known_platforms(self.registry.ids());
        ctx.package_version = package.version.clone();
        ctx.platform_aliases = platform.aliases.clone();
        ctx.variables = platform.template_variables();
        ctx.variables.extend(options.variables.clone());
        ctx
    }

    /// Install one package into one platform layout. `staged` holds what
    /// dry-run executions would have written, across passes.
    pub fn run(
        &self,
        package: &ResolvedPackage,
        platform: &Platform,
        options: &PassOptions,
        ownership: &mut Ownership,
        staged: &mut Staged,
    ) -> PassResult {
        let mut result = PassResult::new(&platform.id);
        let base = self.base_context(package, platform, Direction::Install, options);

        let files = match package
            .files()
            .and_then(|files| filter_files(files, options.filter.as_deref()))
        {
            Ok(files) => files,
            Err(e) => {
                result.fail(FlowFailure::new(package.root.display().to_string(), None, &e));
                result.success = false;
                return result;
            }
        };

        // Replace targets already written in this pass, with the source that wrote them
        let mut claimed: BTreeMap<String, String> = BTreeMap::new();
        let mut merged_targets: BTreeSet<String> = BTreeSet::new();

        for flow in self.registry.flows(platform, Direction::Install) {
            if !flow.applies(&base) {
                tracing::debug!(platform = %platform.id, flow = %flow_label(flow), "skipped due to condition");
                continue;
            }

            let resolution = match pattern::resolve(flow, &files, &base) {
                Ok(resolution) => resolution,
                Err(e) => {
                    result.fail(FlowFailure::new(flow_label(flow), None, &e));
                    continue;
                }
            };

            for (source, e) in &resolution.failures {
                result.fail(FlowFailure::new(source.clone(), None, e));
            }

            for pair in &resolution.pairs {
                let ctx = base.for_source([("name", pair.name.as_str())]);
                let stale = if pair.merge.is_key_tracked() && merged_targets.insert(pair.target.clone()) {
                    ownership.take_previous_keys(&pair.target)
                } else {
                    Vec::new()
                };

                let outcome = executor::execute(flow, pair, &ctx, &stale, staged);
                fold(&mut result, outcome, &package.name, ownership, &mut claimed);
            }
        }

        result.success = result.errors.is_empty();
        tracing::info!(
            package = %package.name,
            platform = %platform.id,
            processed = result.files_processed,
            written = result.files_written,
            conflicts = result.conflicts.len(),
            errors = result.errors.len(),
            dry_run = options.dry_run,
            "platform pass finished"
        );
        result
    }
}

fn fold(
    result: &mut PassResult,
    outcome: ExecutionResult,
    package: &str,
    ownership: &Ownership,
    claimed: &mut BTreeMap<String, String>,
) {
    result.files_processed += 1;

    if let Some(error) = &outcome.error {
        result.fail(FlowFailure::new(outcome.source.clone(), Some(outcome.target.clone()), error));
        return;
    }
    if outcome.skipped {
        tracing::debug!(
            source = %outcome.source,
            reason = outcome.skip_reason.as_deref().unwrap_or_default(),
            "source skipped"
        );
        result.files_skipped += 1;
        return;
    }
    let Some(mapping) = outcome.mapping else {
        return;
    };

    if outcome.written {
        result.files_written += 1;
    }
    if !result.target_paths.contains(&outcome.target_path) {
        result.target_paths.push(outcome.target_path.clone());
    }

    match mapping.merge {
        MergeStrategy::Replace => {
            if let Some(previous) = claimed.insert(mapping.target.clone(), mapping.source.clone())
                && previous != mapping.source
            {
                result.conflict(Conflict {
                    target_path: mapping.target.clone(),
                    winner: mapping.source.clone(),
                    losers: vec![previous.clone()],
                    message: format!(
                        "'{}' overwrote '{}' written earlier in this pass",
                        mapping.source, previous
                    ),
                });
            }
            if let Some(owner) = ownership.file_owner(&mapping.target)
                && owner != package
            {
                result.conflict(Conflict {
                    target_path: mapping.target.clone(),
                    winner: package.to_string(),
                    losers: vec![owner.to_string()],
                    message: format!(
                        "'{}' from {package} overwrote a file installed by {owner}",
                        mapping.target
                    ),
                });
            }
        }
        MergeStrategy::Deep | MergeStrategy::Shallow => {
            let written_keys = mapping.keys.as_deref().unwrap_or_default();
            let losers: Vec<String> = ownership
                .key_owners(&mapping.target)
                .iter()
                .filter(|(owner, _)| owner != package)
                .filter(|(_, owned)| {
                    written_keys
                        .iter()
                        .any(|key| owned.iter().any(|other| keys_overlap(key, other)))
                })
                .map(|(owner, _)| owner.clone())
                .collect();
            if !losers.is_empty() {
                result.conflict(Conflict {
                    target_path: mapping.target.clone(),
                    winner: package.to_string(),
                    message: format!(
                        "{package} overwrote keys in '{}' also owned by {}",
                        mapping.target,
                        losers.join(", ")
                    ),
                    losers,
                });
            }
        }
        MergeStrategy::Composite => {}
    }

    result
        .file_mapping
        .entry(mapping.source.clone())
        .or_default()
        .push(mapping);
}

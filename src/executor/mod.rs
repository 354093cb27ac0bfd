//! Flow execution for one resolved `(source, target)` pair
//!
//! Pipeline: load source, `extract`, `pick`/`omit`, `map`, `pipe`, `embed`,
//! then write according to the flow's merge strategy:
//!
//! - replace: the rendered file overwrites the target
//! - deep/shallow: merged into the existing structured document, recording
//!   the key paths this package owns
//! - composite: upserted as this package's marker section
//!
//! Dry-run runs every step except the physical write. The content it would
//! have written is kept in [`Staged`] so later executions against the same
//! target build on it.

pub mod content;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OpkgError, Result, flow as flow_error, fs as fs_error};
use crate::flow::{Flow, FlowContext};
use crate::merge::{self, Format, MergeStrategy, composite, keys};
use crate::path_utils::from_index_path;
use crate::pattern::ResolvedPair;

use content::Content;

/// Where one source ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTargetMapping {
    pub source: String,
    pub target: String,
    pub merge: MergeStrategy,
    /// Key paths owned in the target; only for deep and shallow merges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

/// A package's contribution to one target, before it is written
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Whole-file content
    Bytes(Vec<u8>),
    /// Structured document to merge
    Document(Value),
    /// Body of the package's composite section
    Section(String),
}

/// Outcome of one execution
#[derive(Debug)]
pub struct ExecutionResult {
    pub source: String,
    /// Workspace-relative target
    pub target: String,
    /// Resolved absolute target path
    pub target_path: PathBuf,
    pub success: bool,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    /// A file was physically written (never on dry-run)
    pub written: bool,
    /// The target's content differs from what the execution produces
    pub changed: bool,
    pub mapping: Option<ResolvedTargetMapping>,
    pub error: Option<OpkgError>,
}

impl ExecutionResult {
    fn new(pair: &ResolvedPair, target_path: PathBuf) -> Self {
        Self {
            source: pair.source.clone(),
            target: pair.target.clone(),
            target_path,
            success: true,
            skipped: false,
            skip_reason: None,
            written: false,
            changed: false,
            mapping: None,
            error: None,
        }
    }

    fn skip(mut self, reason: &str) -> Self {
        self.skipped = true;
        self.skip_reason = Some(reason.to_string());
        self
    }

    fn fail(mut self, error: OpkgError) -> Self {
        self.success = false;
        self.error = Some(error);
        self
    }
}

fn requires_fields(flow: &Flow) -> bool {
    flow.extract.is_some()
        || flow.embed.is_some()
        || !flow.pick.is_empty()
        || !flow.omit.is_empty()
        || !flow.map.is_empty()
}

/// Run the content pipeline of a flow (everything between load and write)
pub fn transform(flow: &Flow, mut content: Content, ctx: &FlowContext, source: &str) -> Result<Content> {
    if requires_fields(flow) {
        let Some(fields) = content.fields_mut() else {
            return Err(flow_error::execution_failed(
                source,
                "field operations need a structured or markdown source",
            ));
        };

        if let Some(path) = &flow.extract {
            *fields = keys::get_path(fields, &keys::split_key(path))
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
        }

        if let Value::Object(map) = fields {
            if !flow.pick.is_empty() {
                map.retain(|k, _| flow.pick.iter().any(|p| p == k));
            }
            for key in &flow.omit {
                map.shift_remove(key);
            }
        }

        for mapping in &flow.map {
            let from = keys::split_key(&mapping.from);
            if let Some(value) = keys::get_path(fields, &from).cloned() {
                keys::remove_path(fields, &from);
                keys::insert_path(fields, &keys::split_key(&mapping.to), value);
            }
        }
    }

    for step in &flow.pipe {
        content = step.apply(content, ctx)?;
    }

    if let Some(embed) = &flow.embed
        && let Some(fields) = content.fields_mut()
    {
        let mut wrapped = Value::Object(Map::new());
        keys::insert_path(&mut wrapped, &keys::split_key(embed), std::mem::take(fields));
        *fields = wrapped;
    }

    Ok(content)
}

/// Render a package's contribution for one pair without touching the target
pub fn render(flow: &Flow, pair: &ResolvedPair, ctx: &FlowContext) -> Result<Rendered> {
    let source_path = ctx.package_root.join(&pair.source);
    let bytes = fs::read(&source_path).map_err(|e| fs_error::read_failed(&source_path, e))?;
    let target = Path::new(&pair.target);

    if pair.merge == MergeStrategy::Replace
        && flow.is_passthrough()
        && Format::from_path(Path::new(&pair.source)) == Format::from_path(target)
    {
        return Ok(Rendered::Bytes(bytes));
    }

    let content = Content::load(bytes, Path::new(&pair.source))?;
    let content = transform(flow, content, ctx, &pair.source)?;

    match pair.merge {
        MergeStrategy::Replace => Ok(Rendered::Bytes(content.render(target)?)),
        MergeStrategy::Composite => Ok(Rendered::Section(content.render_text(target)?)),
        MergeStrategy::Deep | MergeStrategy::Shallow => match content {
            Content::Document { value, .. } => Ok(Rendered::Document(value)),
            _ => Err(flow_error::execution_failed(
                &pair.source,
                format!("{} merge needs a structured source document", pair.merge),
            )),
        },
    }
}

fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read(path).map(Some).map_err(|e| fs_error::read_failed(path, e))
}

/// Target contents produced by dry-run executions, keyed by absolute path
#[derive(Debug, Default, Clone)]
pub struct Staged {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl Staged {
    /// Staged content if any, otherwise the file on disk
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match self.files.get(path) {
            Some(bytes) => Ok(Some(bytes.clone())),
            None => read_existing(path),
        }
    }

    fn read_text(&self, path: &Path) -> Result<Option<String>> {
        self.read(path)?
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|e| flow_error::execution_failed(&path.display().to_string(), e))
            })
            .transpose()
    }

    fn stage(&mut self, path: PathBuf, bytes: Vec<u8>) {
        self.files.insert(path, bytes);
    }
}

fn write_target(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| fs_error::write_failed(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| fs_error::write_failed(path, e))
}

/// Execute one flow for one resolved pair.
///
/// `stale_keys` are the keys this package owned in the target after its
/// previous install; they are removed before merging. On dry-run the
/// output goes to `staged` instead of the target.
pub fn execute(
    flow: &Flow,
    pair: &ResolvedPair,
    ctx: &FlowContext,
    stale_keys: &[String],
    staged: &mut Staged,
) -> ExecutionResult {
    let target_path = from_index_path(&pair.target, &ctx.workspace_root);
    let result = ExecutionResult::new(pair, target_path);

    if !flow.applies(ctx) {
        return result.skip("skipped due to condition");
    }

    match execute_inner(flow, pair, ctx, stale_keys, staged, result.target_path.clone()) {
        Ok(Outcome::Skipped(reason)) => result.skip(reason),
        Ok(Outcome::Done { changed, mapping }) => {
            tracing::debug!(
                source = %pair.source,
                target = %pair.target,
                merge = %pair.merge,
                changed,
                dry_run = ctx.dry_run,
                "flow executed"
            );
            ExecutionResult {
                written: changed && !ctx.dry_run,
                changed,
                mapping: Some(mapping),
                ..result
            }
        }
        Err(e) => result.fail(e),
    }
}

enum Outcome {
    Skipped(&'static str),
    Done {
        changed: bool,
        mapping: ResolvedTargetMapping,
    },
}

fn execute_inner(
    flow: &Flow,
    pair: &ResolvedPair,
    ctx: &FlowContext,
    stale_keys: &[String],
    staged: &mut Staged,
    target_path: PathBuf,
) -> Result<Outcome> {
    let rendered = render(flow, pair, ctx)?;
    let mut mapping = ResolvedTargetMapping {
        source: pair.source.clone(),
        target: pair.target.clone(),
        merge: pair.merge,
        keys: None,
    };

    let (changed, output) = match rendered {
        Rendered::Bytes(bytes) => {
            let existing = staged.read(&target_path)?;
            (existing.as_deref() != Some(bytes.as_slice()), bytes)
        }
        Rendered::Section(body) => {
            let existing = staged.read_text(&target_path)?;
            let updated = composite::upsert_section(existing.as_deref().unwrap_or(""), &ctx.package_name, &body);
            (existing.as_deref() != Some(updated.as_str()), updated.into_bytes())
        }
        Rendered::Document(value) => {
            if keys::owned_keys(&value, pair.merge, flow.embed.as_deref()).is_empty() {
                return Ok(Outcome::Skipped("nothing to merge"));
            }
            let format = Format::from_path(&target_path).ok_or_else(|| {
                flow_error::execution_failed(
                    &pair.source,
                    format!("cannot {} merge into '{}': unsupported format", pair.merge, pair.target),
                )
            })?;
            let existing = staged.read_text(&target_path)?;
            let write = merge::merge_into(
                existing.as_deref(),
                &value,
                pair.merge,
                format,
                flow.embed.as_deref(),
                stale_keys,
                &pair.target,
            )?;
            mapping.keys = Some(write.keys);
            (write.changed, write.content.into_bytes())
        }
    };

    if changed {
        if ctx.dry_run {
            staged.stage(target_path, output);
        } else {
            write_target(&target_path, &output)?;
        }
    }

    Ok(Outcome::Done { changed, mapping })
}

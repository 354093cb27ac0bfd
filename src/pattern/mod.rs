//! Pattern resolution: matching package files against a flow's `from`
//! patterns and rendering the concrete `to` path for each match
//!
//! - `*` matches one path segment; the text it matched is reused where the
//!   target has a `*`, and its stem is available as `{name}`
//! - `**` present on both sides carries the full subdirectory chain over
//! - a `*` that swallowed an extension (`*` against `a.txt`) followed by a
//!   literal extension in the target swaps the extension
//! - `name.<platform>.ext` only matches for that platform and installs as
//!   `name.ext`, replacing the universal file for that platform
//! - with the `prefix` variable set, wildcard-derived file names are
//!   prefixed with the package name
//! - well-known root files and anything under `root/` skip prefixing and
//!   platform suffixes; markdown ones merge as composite sections

pub mod template;

use std::collections::BTreeSet;

use wax::{CandidatePath, Glob, Pattern};

use crate::error::{OpkgError, Result, flow as flow_error};
use crate::flow::{Flow, FlowContext};
use crate::merge::MergeStrategy;
use crate::path_utils::make_path_safe;

/// Top-level instruction files shared by every package
pub const ROOT_FILES: &[&str] = &["AGENTS.md", "CLAUDE.md", "GEMINI.md", "QWEN.md", "WARP.md"];

/// Package directory copied to the workspace root as-is
pub const ROOT_SOURCE_DIR: &str = "root/";

const DEFAULT_PREFIX_SEPARATOR: &str = "-";

/// One source file and the target it resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPair {
    /// Package-relative source path, as found on disk
    pub source: String,
    /// Workspace-relative (or `~/`) target path
    pub target: String,
    pub merge: MergeStrategy,
    /// Value of `{name}` for this source
    pub name: String,
    pub root_exception: bool,
}

/// All pairs a flow produced, plus per-source failures
#[derive(Debug, Default)]
pub struct Resolution {
    pub pairs: Vec<ResolvedPair>,
    pub failures: Vec<(String, OpkgError)>,
}

fn is_root_source(path: &str) -> bool {
    path.starts_with(ROOT_SOURCE_DIR)
}

/// Split `dir/name.<platform>.ext` into the platform id and the logical
/// path `dir/name.ext`. A leading dot belongs to the name, so
/// `.hidden.claude.md` is `.hidden.md` for claude.
pub fn platform_suffix<'a>(path: &'a str, known: &[String]) -> Option<(&'a str, String)> {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };
    let (dot, file) = match file.strip_prefix('.') {
        Some(rest) => (".", rest),
        None => ("", file),
    };

    let parts: Vec<&str> = file.split('.').collect();
    if parts.len() < 3 || parts[0].is_empty() {
        return None;
    }
    let suffix = parts[parts.len() - 2];
    if !known.iter().any(|id| id == suffix) {
        return None;
    }

    let mut logical_parts = parts.clone();
    logical_parts.remove(parts.len() - 2);
    let logical_file = format!("{dot}{}", logical_parts.join("."));

    Some((
        suffix,
        match dir {
            Some(dir) => format!("{dir}/{logical_file}"),
            None => logical_file,
        },
    ))
}

fn strip_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

fn is_glob_meta(c: char) -> bool {
    matches!(c, '*' | '?' | '[' | ']' | '{' | '}')
}

/// What one wildcard segment matched
#[derive(Debug, Clone)]
struct Capture {
    text: String,
    /// No literal text after the wildcard, so `text` may include an extension
    open_ended: bool,
}

impl Capture {
    fn of(segment_pattern: &str, actual: &str) -> Self {
        let prefix_end = segment_pattern.find(is_glob_meta).unwrap_or(segment_pattern.len());
        let suffix_start = segment_pattern
            .rfind(is_glob_meta)
            .map_or(segment_pattern.len(), |i| i + 1);
        let prefix = &segment_pattern[..prefix_end];
        let suffix = &segment_pattern[suffix_start..];

        let text = if actual.len() >= prefix.len() + suffix.len()
            && actual.starts_with(prefix)
            && actual.ends_with(suffix)
        {
            actual[prefix.len()..actual.len() - suffix.len()].to_string()
        } else {
            actual.to_string()
        };

        Self {
            text,
            open_ended: suffix.is_empty(),
        }
    }
}

/// Wildcard captures of one path against one `from` pattern
#[derive(Debug)]
struct Captures {
    chain: Vec<String>,
    stars: Vec<Capture>,
    leaf: String,
}

impl Captures {
    fn compute(from: &str, path: &str) -> Self {
        let from_segs: Vec<&str> = from.split('/').collect();
        let path_segs: Vec<&str> = path.split('/').collect();
        let mut aligned: Vec<(&str, &str)> = Vec::new();
        let mut chain = Vec::new();

        if let Some(i) = from_segs.iter().position(|s| *s == "**") {
            let suffix_len = from_segs.len() - i - 1;
            let head_end = i.min(path_segs.len());
            let tail_start = path_segs.len().saturating_sub(suffix_len).max(head_end);

            aligned.extend(from_segs[..i].iter().copied().zip(path_segs[..head_end].iter().copied()));
            chain = path_segs[head_end..tail_start]
                .iter()
                .map(ToString::to_string)
                .collect();
            aligned.extend(
                from_segs[i + 1..]
                    .iter()
                    .copied()
                    .zip(path_segs[tail_start..].iter().copied()),
            );
        } else {
            aligned.extend(from_segs.iter().copied().zip(path_segs.iter().copied()));
        }

        let stars = aligned
            .into_iter()
            .filter(|(pattern, _)| pattern.contains(is_glob_meta))
            .map(|(pattern, actual)| Capture::of(pattern, actual))
            .collect();

        Self {
            chain,
            stars,
            leaf: path_segs.last().map(ToString::to_string).unwrap_or_default(),
        }
    }

    /// `{name}`: the leaf wildcard's capture without extension, or the file stem
    fn name(&self) -> String {
        match self.stars.last() {
            Some(capture) if capture.open_ended => strip_extension(&capture.text),
            Some(capture) => capture.text.clone(),
            None => strip_extension(&self.leaf),
        }
    }

    /// Substitute wildcards of an already template-rendered target pattern
    fn apply(&self, target: &str) -> Vec<String> {
        let fallback = Capture {
            text: self.leaf.clone(),
            open_ended: true,
        };
        let mut out = Vec::new();
        let mut star_idx = 0;

        for segment in target.split('/') {
            if segment == "**" {
                out.extend(self.chain.iter().cloned());
                continue;
            }
            if let Some(pos) = segment.find('*') {
                let capture = self
                    .stars
                    .get(star_idx)
                    .or(self.stars.last())
                    .unwrap_or(&fallback);
                star_idx += 1;

                let after = &segment[pos + 1..];
                let text = if capture.open_ended && after.starts_with('.') {
                    strip_extension(&capture.text)
                } else {
                    capture.text.clone()
                };
                out.push(format!("{}{text}{after}", &segment[..pos]));
                continue;
            }
            if !segment.is_empty() {
                out.push(segment.to_string());
            }
        }
        out
    }
}

/// Resolve a flow against a package's file list.
///
/// Errors in the flow itself (bad glob, unmatched switch) fail the whole
/// flow; an unresolvable target for one source is recorded in
/// [`Resolution::failures`] and the others still resolve.
pub fn resolve(flow: &Flow, files: &[String], ctx: &FlowContext) -> Result<Resolution> {
    let lookup = |name: &str| ctx.variable(name);

    let from_patterns = flow
        .from
        .resolve(ctx)?
        .iter()
        .map(|p| template::render(p, lookup))
        .collect::<Result<Vec<_>>>()?;
    let to_pattern = flow.to.resolve(ctx)?;

    let globs = from_patterns
        .iter()
        .map(|p| {
            Glob::new(p)
                .map(|glob| (p.as_str(), glob))
                .map_err(|e| flow_error::invalid_pattern(p, e))
        })
        .collect::<Result<Vec<_>>>()?;

    // Universal files shadowed by a suffixed variant for this platform
    let overridden: BTreeSet<String> = files
        .iter()
        .filter(|f| !is_root_source(f))
        .filter_map(|f| platform_suffix(f, &ctx.known_platforms))
        .filter(|(platform, _)| *platform == ctx.platform)
        .map(|(_, logical)| logical)
        .collect();

    let mut resolution = Resolution::default();

    for source in files {
        let logical = if is_root_source(source) {
            source.clone()
        } else {
            match platform_suffix(source, &ctx.known_platforms) {
                Some((platform, logical)) if platform == ctx.platform => logical,
                Some(_) => continue,
                None if overridden.contains(source) => continue,
                None => source.clone(),
            }
        };

        let candidate = CandidatePath::from(logical.as_str());
        let Some((from, _)) = globs.iter().find(|(_, glob)| glob.matched(&candidate).is_some()) else {
            continue;
        };

        match render_target(from, &to_pattern, &logical, source, flow.merge, ctx) {
            Ok(pair) => resolution.pairs.push(pair),
            Err(e) => resolution.failures.push((source.clone(), e)),
        }
    }

    Ok(resolution)
}

fn render_target(
    from: &str,
    to: &str,
    logical: &str,
    source: &str,
    merge: MergeStrategy,
    ctx: &FlowContext,
) -> Result<ResolvedPair> {
    let captures = Captures::compute(from, logical);
    let name = captures.name();

    let rendered = template::render(to, |var| {
        if var == "name" {
            Some(name.clone())
        } else {
            ctx.variable(var)
        }
    })?;
    let mut segments = captures.apply(&rendered);

    let root_exception = is_root_source(source)
        || (segments.len() == 1 && ROOT_FILES.contains(&segments[0].as_str()));

    let to_leaf = to.rsplit('/').next().unwrap_or(to);
    let leaf_is_derived = to_leaf.contains('*') || template::references(to_leaf, "name");
    if !root_exception
        && leaf_is_derived
        && ctx.is_truthy("prefix")
        && let Some(leaf) = segments.last_mut()
    {
        let separator = ctx
            .variable("prefixSeparator")
            .unwrap_or_else(|| DEFAULT_PREFIX_SEPARATOR.to_string());
        *leaf = format!("{}{separator}{leaf}", make_path_safe(&ctx.package_name));
    }

    let target = segments.join("/");
    let merge = if root_exception && target.to_ascii_lowercase().ends_with(".md") {
        MergeStrategy::Composite
    } else {
        merge
    };

    Ok(ResolvedPair {
        source: source.to_string(),
        target,
        merge,
        name,
        root_exception,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(platform: &str) -> FlowContext {
        FlowContext::new("/ws", "/pkg", platform, "@acme/tools").with_known_platforms(vec![
            "claude".to_string(),
            "cursor".to_string(),
            "opencode".to_string(),
        ])
    }

    fn files(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn targets(flow: &Flow, list: &[&str], ctx: &FlowContext) -> Vec<(String, String)> {
        resolve(flow, &files(list), ctx)
            .unwrap()
            .pairs
            .into_iter()
            .map(|p| (p.source, p.target))
            .collect()
    }

    #[test]
    fn test_recursive_glob_preserves_deep_chain() {
        let flow = Flow::new("rules/**/*.md", ".cursor/rules/**/*.md");
        assert_eq!(
            targets(&flow, &["rules/a/b/c/d/e/deep.md", "rules/top.md"], &ctx("cursor")),
            vec![
                (
                    "rules/a/b/c/d/e/deep.md".to_string(),
                    ".cursor/rules/a/b/c/d/e/deep.md".to_string()
                ),
                ("rules/top.md".to_string(), ".cursor/rules/top.md".to_string()),
            ]
        );
    }

    #[test]
    fn test_extension_substitution() {
        let flow = Flow::new("rules/**/*.md", ".cursor/rules/**/*.mdc");
        assert_eq!(
            targets(&flow, &["rules/style/naming.md"], &ctx("cursor")),
            vec![(
                "rules/style/naming.md".to_string(),
                ".cursor/rules/style/naming.mdc".to_string()
            )]
        );

        let open = Flow::new("notes/*", ".x/notes/*.md");
        assert_eq!(
            targets(&open, &["notes/todo.txt"], &ctx("cursor"))[0].1,
            ".x/notes/todo.md"
        );
    }

    #[test]
    fn test_name_variable() {
        let flow = Flow::new("commands/*.md", ".github/prompts/{name}.prompt.md");
        assert_eq!(
            targets(&flow, &["commands/deploy.md"], &ctx("claude"))[0].1,
            ".github/prompts/deploy.prompt.md"
        );
    }

    #[test]
    fn test_zero_matches_is_not_an_error() {
        let flow = Flow::new("agents/**/*.md", ".claude/agents/**/*.md");
        let resolution = resolve(&flow, &files(&["rules/a.md"]), &ctx("claude")).unwrap();
        assert!(resolution.pairs.is_empty());
        assert!(resolution.failures.is_empty());
    }

    #[test]
    fn test_platform_suffix_override() {
        let flow = Flow::new("commands/**/*.md", "{rootDir}/commands/**/*.md");
        let list = ["commands/x.md", "commands/x.claude.md", "commands/y.md"];

        let claude = ctx("claude").with_variable("rootDir", ".claude");
        assert_eq!(
            targets(&flow, &list, &claude),
            vec![
                ("commands/x.claude.md".to_string(), ".claude/commands/x.md".to_string()),
                ("commands/y.md".to_string(), ".claude/commands/y.md".to_string()),
            ]
        );

        let cursor = ctx("cursor").with_variable("rootDir", ".cursor");
        assert_eq!(
            targets(&flow, &list, &cursor),
            vec![
                ("commands/x.md".to_string(), ".cursor/commands/x.md".to_string()),
                ("commands/y.md".to_string(), ".cursor/commands/y.md".to_string()),
            ]
        );
    }

    #[test]
    fn test_suffix_only_file_skipped_elsewhere() {
        let flow = Flow::new("commands/**/*.md", ".cursor/commands/**/*.md");
        assert!(targets(&flow, &["commands/cmd.claude.md"], &ctx("cursor")).is_empty());
    }

    #[test]
    fn test_prefixing_wildcard_leaf() {
        let flow = Flow::new("commands/**/*.md", ".claude/commands/**/*.md");
        let prefixed = ctx("claude").with_variable("prefix", "true");
        assert_eq!(
            targets(&flow, &["commands/ops/deploy.md"], &prefixed)[0].1,
            ".claude/commands/ops/acme-tools-deploy.md"
        );

        let custom = prefixed.with_variable("prefixSeparator", "_");
        assert_eq!(
            targets(&flow, &["commands/deploy.md"], &custom)[0].1,
            ".claude/commands/acme-tools_deploy.md"
        );
    }

    #[test]
    fn test_root_exceptions_skip_prefix_and_use_composite() {
        let prefixed = ctx("claude")
            .with_variable("prefix", "true")
            .with_variable("rootFile", "CLAUDE.md");

        let agents = Flow::new("AGENTS.md", "{rootFile}");
        let pair = &resolve(&agents, &files(&["AGENTS.md"]), &prefixed).unwrap().pairs[0];
        assert_eq!(pair.target, "CLAUDE.md");
        assert_eq!(pair.merge, MergeStrategy::Composite);
        assert!(pair.root_exception);

        let root = Flow::new("root/**/*", "**/*");
        let resolution = resolve(
            &root,
            &files(&["root/docs/GUIDE.md", "root/Makefile", "root/x.claude.md"]),
            &prefixed,
        )
        .unwrap();
        let pairs: Vec<_> = resolution
            .pairs
            .iter()
            .map(|p| (p.target.as_str(), p.merge))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("docs/GUIDE.md", MergeStrategy::Composite),
                ("Makefile", MergeStrategy::Replace),
                ("x.claude.md", MergeStrategy::Composite),
            ]
        );
    }

    #[test]
    fn test_unresolved_target_variable_fails_only_that_source() {
        let flow = Flow::new("commands/*.md", "{missingDir}/{name}.md");
        let resolution = resolve(&flow, &files(&["commands/a.md", "commands/b.md"]), &ctx("claude")).unwrap();
        assert!(resolution.pairs.is_empty());
        assert_eq!(resolution.failures.len(), 2);
        assert!(matches!(
            resolution.failures[0].1,
            OpkgError::PatternResolution { .. }
        ));
    }

    #[test]
    fn test_multiple_from_patterns() {
        let flow = Flow::new(
            crate::flow::FlowSource::Many(vec!["mcp.jsonc".to_string(), "mcp.json".to_string()]),
            ".mcp.json",
        );
        assert_eq!(
            targets(&flow, &["mcp.json", "other.json"], &ctx("claude")),
            vec![("mcp.json".to_string(), ".mcp.json".to_string())]
        );
    }

    #[test]
    fn test_skills_directory_structure() {
        let flow = Flow::new("skills/**/*", ".claude/skills/**/*");
        assert_eq!(
            targets(&flow, &["skills/review/SKILL.md", "skills/review/scripts/run.sh"], &ctx("claude")),
            vec![
                ("skills/review/SKILL.md".to_string(), ".claude/skills/review/SKILL.md".to_string()),
                (
                    "skills/review/scripts/run.sh".to_string(),
                    ".claude/skills/review/scripts/run.sh".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_import_direction_reverses_suffix_pattern() {
        let flow = Flow::new(".github/instructions/**/*.instructions.md", "rules/**/*.md");
        assert_eq!(
            targets(&flow, &[".github/instructions/style.instructions.md"], &ctx("claude"))[0].1,
            "rules/style.md"
        );
    }

    #[test]
    fn test_invalid_glob_fails_flow() {
        let flow = Flow::new("rules/[", ".x/rules");
        let err = resolve(&flow, &files(&["rules/a"]), &ctx("claude")).unwrap_err();
        assert!(matches!(err, OpkgError::InvalidPattern { .. }));
    }

    #[test]
    fn test_platform_suffix_parsing() {
        let known = vec!["claude".to_string()];
        assert_eq!(
            platform_suffix("commands/x.claude.md", &known),
            Some(("claude", "commands/x.md".to_string()))
        );
        assert_eq!(platform_suffix("commands/x.md", &known), None);
        assert_eq!(platform_suffix("x.other.md", &known), None);
    }

    #[test]
    fn test_platform_suffix_on_dotfiles() {
        let known = vec!["claude".to_string()];
        assert_eq!(
            platform_suffix("rules/.hidden.claude.md", &known),
            Some(("claude", "rules/.hidden.md".to_string()))
        );
        assert_eq!(platform_suffix(".claude.md", &known), None);
    }
}

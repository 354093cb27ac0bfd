//! Platform registry for managing platform definitions
//!
//! This module provides:
//! - Platform lookup by id or alias
//! - Platform detection
//! - Flow ordering (global flows first, then platform flows, by priority)
//! - Default platform definitions

use std::path::Path;

use super::Platform;
use crate::error::{OpkgError, Result};
use crate::flow::{Condition, Direction, Flow, Transform};
use crate::merge::MergeStrategy;

/// Registry of all supported platforms.
///
/// Immutable once built; overrides produce a new registry.
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    platforms: Vec<Platform>,
    global_export: Vec<Flow>,
    global_import: Vec<Flow>,
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PlatformRegistry {
    /// Create a registry with the given platforms and the built-in global flows
    pub fn new(platforms: Vec<Platform>) -> Self {
        Self {
            platforms,
            global_export: global_export_flows(),
            global_import: Vec::new(),
        }
    }

    /// Create a registry with default platforms
    pub fn builtin() -> Self {
        Self::new(default_platforms())
    }

    /// Replace the global flows
    pub fn with_global_flows(mut self, export: Vec<Flow>, import: Vec<Flow>) -> Self {
        self.global_export = export;
        self.global_import = import;
        self
    }

    /// A new registry where `overrides` replace platforms with matching ids
    /// and unknown ids are appended
    pub fn with_overrides(&self, overrides: Vec<Platform>) -> Self {
        let mut platforms = self.platforms.clone();

        for platform in overrides {
            if let Some(pos) = platforms.iter().position(|p| p.id == platform.id) {
                platforms[pos] = platform;
            } else {
                platforms.push(platform);
            }
        }

        Self {
            platforms,
            global_export: self.global_export.clone(),
            global_import: self.global_import.clone(),
        }
    }

    /// Get a platform by its ID or one of its aliases
    pub fn get_by_id(&self, id: &str) -> Option<&Platform> {
        self.platforms
            .iter()
            .find(|p| p.id == id)
            .or_else(|| self.platforms.iter().find(|p| p.answers_to(id)))
    }

    /// Resolve every requested id, failing on the first unknown one
    pub fn resolve_ids(&self, ids: &[String]) -> Result<Vec<&Platform>> {
        ids.iter()
            .map(|id| {
                self.get_by_id(id)
                    .ok_or_else(|| OpkgError::PlatformNotSupported {
                        platform: id.clone(),
                    })
            })
            .collect()
    }

    /// Get all platforms in the registry
    pub fn all(&self) -> &[Platform] {
        &self.platforms
    }

    /// Every platform id, used to recognize `name.<platform>.ext` suffixes
    pub fn ids(&self) -> Vec<String> {
        self.platforms.iter().map(|p| p.id.clone()).collect()
    }

    /// Detect which platforms are present in the workspace
    pub fn detect_all(&self, workspace_root: &Path) -> Vec<&Platform> {
        self.platforms
            .iter()
            .filter(|p| p.is_detected(workspace_root))
            .collect()
    }

    /// Flows for one platform in execution order: global flows, then the
    /// platform's own, stably sorted by ascending priority
    pub fn flows<'a>(&'a self, platform: &'a Platform, direction: Direction) -> Vec<&'a Flow> {
        let (global, own) = match direction {
            Direction::Install => (&self.global_export, &platform.export),
            Direction::Save => (&self.global_import, &platform.import),
        };

        let mut flows: Vec<&Flow> = global.iter().chain(own.iter()).collect();
        flows.sort_by_key(|f| f.priority);
        flows
    }
}

fn pipe(name: &str) -> Option<Transform> {
    Transform::lookup(name).ok()
}

fn with_pipe(flow: Flow, name: &str) -> Flow {
    match pipe(name) {
        Some(transform) => flow.with_pipe(transform),
        None => flow,
    }
}

/// Flows every platform runs
///
/// - `AGENTS.md` is merged as a package-labeled section into the platform's root file
/// - anything under `root/` is copied to the workspace root unchanged
fn global_export_flows() -> Vec<Flow> {
    vec![
        Flow::new("AGENTS.md", "{rootFile}")
            .with_merge(MergeStrategy::Composite)
            .with_when(Condition::Exists {
                var: "rootFile".to_string(),
            }),
        Flow::new("root/**/*", "**/*"),
    ]
}

/// Deep-merged MCP server definitions: `mcp.jsonc` holds `{"mcpServers": {...}}`
fn mcp_export(target: &str, embed: &str) -> Flow {
    with_pipe(
        Flow::new("mcp.jsonc", target)
            .with_merge(MergeStrategy::Deep)
            .with_extract("mcpServers")
            .with_embed(embed),
        "filter-null",
    )
}

fn mcp_import(source: &str, embed: &str) -> Flow {
    Flow::new(source, "mcp.jsonc")
        .with_merge(MergeStrategy::Deep)
        .with_extract(embed)
        .with_embed("mcpServers")
}

/// Export and import flow pairs for a plain directory mapping
fn mirrored(platform: Platform, universal: &str, platform_dir: &str, leaf: &str) -> Platform {
    let (from_leaf, to_leaf) = match leaf.split_once("->") {
        Some((from, to)) => (from, to),
        None => (leaf, leaf),
    };
    platform
        .with_export(Flow::new(
            format!("{universal}/**/{from_leaf}").as_str(),
            format!("{platform_dir}/**/{to_leaf}").as_str(),
        ))
        .with_import(Flow::new(
            format!("{platform_dir}/**/{to_leaf}").as_str(),
            format!("{universal}/**/{from_leaf}").as_str(),
        ))
}

/// Get default platform definitions
pub fn default_platforms() -> Vec<Platform> {
    let claude = Platform::new("claude", "Claude Code", ".claude")
        .with_root_file("CLAUDE.md")
        .with_alias("claude-code")
        .with_detection("CLAUDE.md");
    let claude = mirrored(claude, "commands", ".claude/commands", "*.md");
    let claude = mirrored(claude, "rules", ".claude/rules", "*.md");
    let claude = mirrored(claude, "agents", ".claude/agents", "*.md");
    let claude = mirrored(claude, "skills", ".claude/skills", "*")
        .with_export(mcp_export(".mcp.json", "mcpServers"))
        .with_import(mcp_import(".mcp.json", "mcpServers"));

    let cursor = Platform::new("cursor", "Cursor", ".cursor")
        .with_root_file("AGENTS.md")
        .with_alias("cursor-ai");
    let cursor = mirrored(cursor, "commands", ".cursor/commands", "*.md");
    let cursor = mirrored(cursor, "rules", ".cursor/rules", "*.md->*.mdc");
    let cursor = mirrored(cursor, "agents", ".cursor/agents", "*.md");
    let cursor = mirrored(cursor, "skills", ".cursor/skills", "*")
        .with_export(mcp_export(".cursor/mcp.json", "mcpServers"))
        .with_import(mcp_import(".cursor/mcp.json", "mcpServers"));

    let windsurf = Platform::new("windsurf", "Windsurf", ".windsurf");
    let windsurf = mirrored(windsurf, "rules", ".windsurf/rules", "*.md");
    let windsurf = mirrored(windsurf, "commands", ".windsurf/workflows", "*.md");
    let windsurf = mirrored(windsurf, "skills", ".windsurf/skills", "*");

    let opencode = Platform::new("opencode", "OpenCode", ".opencode").with_root_file("AGENTS.md");
    let opencode = mirrored(opencode, "commands", ".opencode/commands", "*.md");
    let opencode = mirrored(opencode, "rules", ".opencode/rules", "*.md");
    let opencode = mirrored(opencode, "skills", ".opencode/skills", "*");
    let opencode = opencode
        .with_export(with_pipe(
            Flow::new("agents/**/*.md", ".opencode/agents/**/*.md"),
            "platform-frontmatter",
        ))
        .with_import(Flow::new(".opencode/agents/**/*.md", "agents/**/*.md"))
        .with_export(mcp_export(".opencode/opencode.json", "mcp"))
        .with_import(mcp_import(".opencode/opencode.json", "mcp"));

    let copilot = Platform::new("copilot", "GitHub Copilot", ".github")
        .with_root_file("AGENTS.md")
        .with_detection(".github/copilot-instructions.md")
        .with_export(Flow::new(
            "rules/**/*.md",
            ".github/instructions/**/*.instructions.md",
        ))
        .with_import(Flow::new(
            ".github/instructions/**/*.instructions.md",
            "rules/**/*.md",
        ))
        .with_export(Flow::new("commands/**/*.md", ".github/prompts/**/*.prompt.md"))
        .with_import(Flow::new(".github/prompts/**/*.prompt.md", "commands/**/*.md"));
    let copilot = mirrored(copilot, "skills", ".github/skills", "*")
        .with_export(mcp_export(".vscode/mcp.json", "servers"))
        .with_import(mcp_import(".vscode/mcp.json", "servers"));

    let codex = Platform::new("codex", "Codex CLI", ".codex").with_root_file("AGENTS.md");
    let codex = mirrored(codex, "commands", ".codex/prompts", "*.md");
    let codex = mirrored(codex, "skills", ".codex/skills", "*")
        .with_export(mcp_export(".codex/config.toml", "mcp_servers"))
        .with_import(mcp_import(".codex/config.toml", "mcp_servers"));

    let gemini = Platform::new("gemini", "Gemini CLI", ".gemini")
        .with_root_file("GEMINI.md")
        .with_detection("GEMINI.md")
        .with_export(with_pipe(
            Flow::new("commands/**/*.md", ".gemini/commands/**/*.toml"),
            "markdown-to-toml",
        ))
        .with_export(mcp_export(".gemini/settings.json", "mcpServers"))
        .with_import(mcp_import(".gemini/settings.json", "mcpServers"));
    let gemini = mirrored(gemini, "skills", ".gemini/skills", "*");

    let kiro = Platform::new("kiro", "Kiro", ".kiro");
    let kiro = mirrored(kiro, "rules", ".kiro/steering", "*.md")
        .with_export(mcp_export(".kiro/settings/mcp.json", "mcpServers"))
        .with_import(mcp_import(".kiro/settings/mcp.json", "mcpServers"));

    let roo = Platform::new("roo", "Roo Code", ".roo").with_root_file("AGENTS.md");
    let roo = mirrored(roo, "commands", ".roo/commands", "*.md");
    let roo = mirrored(roo, "rules", ".roo/rules", "*.md");
    let roo = mirrored(roo, "skills", ".roo/skills", "*")
        .with_export(mcp_export(".roo/mcp.json", "mcpServers"))
        .with_import(mcp_import(".roo/mcp.json", "mcpServers"));

    let qwen = Platform::new("qwen", "Qwen Code", ".qwen")
        .with_root_file("QWEN.md")
        .with_detection("QWEN.md");
    let qwen = mirrored(qwen, "agents", ".qwen/agents", "*.md");
    let qwen = mirrored(qwen, "skills", ".qwen/skills", "*")
        .with_export(mcp_export(".qwen/settings.json", "mcpServers"))
        .with_import(mcp_import(".qwen/settings.json", "mcpServers"));

    let warp = Platform::new("warp", "Warp", ".warp")
        .with_root_file("WARP.md")
        .with_detection("WARP.md");

    vec![
        claude, cursor, windsurf, opencode, copilot, codex, gemini, kiro, roo, qwen, warp,
    ]
}

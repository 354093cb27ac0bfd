//! Platform definitions
//!
//! This module handles:
//! - Platform definitions (root directory, root file, aliases, flows, variables)
//! - Platform registration and lookup (via `PlatformRegistry`)
//! - Loading `platforms.jsonc` overrides (via `PlatformLoader`)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OpkgError, Result};
use crate::flow::Flow;

pub mod loader;
pub mod registry;

pub use loader::PlatformLoader;
pub use registry::PlatformRegistry;

/// A supported AI coding platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    /// Platform identifier (e.g., "claude", "cursor", "opencode")
    pub id: String,

    /// Display name for the platform
    pub name: String,

    /// Directory where platform-specific files are stored (e.g., ".claude", ".cursor")
    pub root_dir: String,

    /// Top-level instructions file the platform reads (e.g., "CLAUDE.md")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_file: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Extra paths whose presence indicates this platform
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detection: Vec<String>,

    /// Install flows
    #[serde(default)]
    pub export: Vec<Flow>,

    /// Save flows
    #[serde(default)]
    pub import: Vec<Flow>,

    /// Template variables available to this platform's flows
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, Value>,
}

impl Platform {
    /// Create a new platform
    pub fn new(id: impl Into<String>, name: impl Into<String>, root_dir: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            root_dir: root_dir.into(),
            root_file: None,
            aliases: Vec::new(),
            detection: Vec::new(),
            export: Vec::new(),
            import: Vec::new(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_root_file(mut self, file: impl Into<String>) -> Self {
        self.root_file = Some(file.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Add a detection pattern
    pub fn with_detection(mut self, pattern: impl Into<String>) -> Self {
        self.detection.push(pattern.into());
        self
    }

    pub fn with_export(mut self, flow: Flow) -> Self {
        self.export.push(flow);
        self
    }

    pub fn with_import(mut self, flow: Flow) -> Self {
        self.import.push(flow);
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Whether `name` is this platform's id or one of its aliases
    pub fn answers_to(&self, name: &str) -> bool {
        self.id == name || self.aliases.iter().any(|a| a == name)
    }

    /// Whether the platform's root directory or any detection path exists
    pub fn is_detected(&self, workspace_root: &Path) -> bool {
        workspace_root.join(&self.root_dir).exists()
            || self
                .detection
                .iter()
                .any(|pattern| workspace_root.join(pattern).exists())
    }

    /// Get the platform directory path
    pub fn directory_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.root_dir)
    }

    /// Variables as template strings, with `rootDir` and `rootFile` filled in
    pub fn template_variables(&self) -> BTreeMap<String, String> {
        let mut vars: BTreeMap<String, String> = self
            .variables
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect();
        vars.insert("rootDir".to_string(), self.root_dir.clone());
        if let Some(root_file) = &self.root_file {
            vars.insert("rootFile".to_string(), root_file.clone());
        }
        vars
    }

    /// Pre-flight checks run when platform definitions are loaded
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| Err(OpkgError::PlatformConfigFailed { message });

        if self.id.trim().is_empty() {
            return fail("platform id must not be empty".to_string());
        }
        if self.root_dir.trim().is_empty() {
            return fail(format!("platform '{}' has an empty rootDir", self.id));
        }
        for flow in self.export.iter().chain(&self.import) {
            if flow.merge.is_key_tracked() || flow.embed.is_none() {
                continue;
            }
            return fail(format!(
                "platform '{}': `embed` requires a deep or shallow merge, found '{}'",
                self.id, flow.merge
            ));
        }
        Ok(())
    }
}

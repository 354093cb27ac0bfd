//! Platform configuration loading and merging
//!
//! This module handles loading platform overrides from `platforms.jsonc`
//! files and merging them into the built-in registry.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{Platform, PlatformRegistry};
use crate::error::{OpkgError, Result};
use crate::merge::document::strip_jsonc_comments;

/// Workspace-local override file, relative to the workspace root
pub const WORKSPACE_PLATFORMS_FILE: &str = ".opkg/platforms.jsonc";

/// Platform configuration loader
pub struct PlatformLoader {
    /// Workspace root directory
    workspace_root: PathBuf,
    /// Global override file (`<config_dir>/opkg/platforms.jsonc` by default)
    global_path: Option<PathBuf>,
}

impl PlatformLoader {
    /// Create a new platform loader
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            global_path: dirs::config_dir().map(|dir| dir.join("opkg").join("platforms.jsonc")),
        }
    }

    /// Use a different global override file, or none
    pub fn with_global_path(mut self, path: Option<PathBuf>) -> Self {
        self.global_path = path;
        self
    }

    /// Load the registry
    ///
    /// Priority order (later sources override earlier ones):
    /// 1. Built-in platforms
    /// 2. Workspace `.opkg/platforms.jsonc` (if exists)
    /// 3. Global `platforms.jsonc` (if exists)
    pub fn load(&self) -> Result<PlatformRegistry> {
        let mut registry = PlatformRegistry::builtin();

        let workspace_path = self.workspace_root.join(WORKSPACE_PLATFORMS_FILE);
        if let Some(platforms) = Self::load_file(&workspace_path)? {
            tracing::debug!(path = %workspace_path.display(), count = platforms.len(), "workspace platform overrides");
            registry = registry.with_overrides(platforms);
        }

        if let Some(global_path) = &self.global_path
            && let Some(platforms) = Self::load_file(global_path)?
        {
            tracing::debug!(path = %global_path.display(), count = platforms.len(), "global platform overrides");
            registry = registry.with_overrides(platforms);
        }

        Ok(registry)
    }

    fn load_file(path: &Path) -> Result<Option<Vec<Platform>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| OpkgError::ConfigReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let platforms = parse_platforms_json(&strip_jsonc_comments(&content), &path.display().to_string())?;
        for platform in &platforms {
            platform.validate()?;
        }
        Ok(Some(platforms))
    }
}

/// Parse platforms JSON, supporting both array format and object with "platforms" key
pub fn parse_platforms_json(json_content: &str, path: &str) -> Result<Vec<Platform>> {
    let parse_failed = |reason: String| OpkgError::ConfigParseFailed {
        path: path.to_string(),
        reason,
    };

    let value: Value = serde_json::from_str(json_content).map_err(|e| parse_failed(e.to_string()))?;

    let platforms = match value {
        Value::Array(platforms) => platforms,
        Value::Object(mut obj) => match obj.shift_remove("platforms") {
            Some(Value::Array(platforms)) => platforms,
            Some(_) => return Err(parse_failed("platforms field must be an array".to_string())),
            None => {
                return Err(parse_failed(
                    "Expected array of platforms or object with 'platforms' key".to_string(),
                ));
            }
        },
        _ => {
            return Err(parse_failed(
                "Expected array of platforms or object with 'platforms' key".to_string(),
            ));
        }
    };

    serde_json::from_value(Value::Array(platforms)).map_err(|e| parse_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn loader(workspace: &Path) -> PlatformLoader {
        PlatformLoader::new(workspace).with_global_path(None)
    }

    #[test]
    fn test_builtin_platforms() {
        let temp = TempDir::new().unwrap();
        let registry = loader(temp.path()).load().unwrap();

        assert!(registry.get_by_id("claude").is_some());
        assert!(registry.get_by_id("cursor").is_some());
        assert!(registry.get_by_id("opencode").is_some());
    }

    #[test]
    fn test_parse_platforms_json_array() {
        let json = r#"[{"id":"test","name":"Test","rootDir":".test"}]"#;
        let platforms = parse_platforms_json(json, "test.jsonc").unwrap();
        assert_eq!(platforms.len(), 1);
        assert_eq!(platforms[0].id, "test");
    }

    #[test]
    fn test_parse_platforms_json_object() {
        let json = r#"{"platforms":[{"id":"test","name":"Test","rootDir":".test"}]}"#;
        let platforms = parse_platforms_json(json, "test.jsonc").unwrap();
        assert_eq!(platforms.len(), 1);
    }

    #[test]
    fn test_parse_platforms_rejects_bad_shape() {
        assert!(parse_platforms_json(r#"{"platforms": {}}"#, "p.jsonc").is_err());
        assert!(parse_platforms_json("42", "p.jsonc").is_err());
        assert!(
            parse_platforms_json(
                r#"[{"id":"t","name":"T","rootDir":".t","export":[{"from":"a","to":"b","merge":"weird"}]}]"#,
                "p.jsonc"
            )
            .is_err()
        );
    }

    #[test]
    fn test_workspace_overrides_with_comments() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".opkg")).unwrap();
        std::fs::write(
            temp.path().join(WORKSPACE_PLATFORMS_FILE),
            r#"{
                // custom claude layout
                "platforms": [
                    {
                        "id": "claude",
                        "name": "Claude Code (custom)",
                        "rootDir": ".claude",
                        "export": [{"from": "commands/**/*.md", "to": ".claude/custom/**/*.md"}]
                    }
                ]
            }"#,
        )
        .unwrap();

        let registry = loader(temp.path()).load().unwrap();
        let claude = registry.get_by_id("claude").unwrap();
        assert_eq!(claude.name, "Claude Code (custom)");
        assert_eq!(claude.export.len(), 1);
    }

    #[test]
    fn test_global_overrides_apply_last() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.jsonc");
        std::fs::create_dir_all(temp.path().join(".opkg")).unwrap();
        std::fs::write(
            temp.path().join(WORKSPACE_PLATFORMS_FILE),
            r#"[{"id": "acme", "name": "Workspace Acme", "rootDir": ".acme"}]"#,
        )
        .unwrap();
        std::fs::write(&global, r#"[{"id": "acme", "name": "Global Acme", "rootDir": ".acme"}]"#)
            .unwrap();

        let registry = PlatformLoader::new(temp.path())
            .with_global_path(Some(global))
            .load()
            .unwrap();
        assert_eq!(registry.get_by_id("acme").unwrap().name, "Global Acme");
    }

    #[test]
    fn test_invalid_override_fails_load() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".opkg")).unwrap();
        std::fs::write(
            temp.path().join(WORKSPACE_PLATFORMS_FILE),
            r#"[{"id": "", "name": "Nameless", "rootDir": ".x"}]"#,
        )
        .unwrap();

        let err = loader(temp.path()).load().unwrap_err();
        assert!(matches!(err, OpkgError::PlatformConfigFailed { .. }));
    }
}

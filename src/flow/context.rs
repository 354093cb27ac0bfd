//! Execution context threaded through one flow execution

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Direction a flow moves content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Universal package content into a platform layout (export flows)
    #[default]
    Install,
    /// Platform layout back into universal package content (import flows)
    Save,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => f.write_str("install"),
            Self::Save => f.write_str("save"),
        }
    }
}

/// Values that stay fixed for one execution.
///
/// A pass builds one base context; every matched source gets its own copy
/// extended with per-file variables via [`FlowContext::for_source`].
#[derive(Debug, Clone)]
pub struct FlowContext {
    pub workspace_root: PathBuf,
    pub package_root: PathBuf,
    pub platform: String,
    pub platform_aliases: Vec<String>,
    pub package_name: String,
    pub package_version: Option<String>,
    pub direction: Direction,
    pub variables: BTreeMap<String, String>,
    /// Every platform id the registry knows, for suffix and frontmatter-block detection
    pub known_platforms: Vec<String>,
    pub dry_run: bool,
}

impl FlowContext {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        package_root: impl Into<PathBuf>,
        platform: impl Into<String>,
        package_name: impl Into<String>,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            package_root: package_root.into(),
            platform: platform.into(),
            platform_aliases: Vec::new(),
            package_name: package_name.into(),
            package_version: None,
            direction: Direction::Install,
            variables: BTreeMap::new(),
            known_platforms: Vec::new(),
            dry_run: false,
        }
    }

    pub fn with_known_platforms(mut self, ids: Vec<String>) -> Self {
        self.known_platforms = ids;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Derive the context for one matched source, adding per-file variables
    pub fn for_source<I, K, V>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut derived = self.clone();
        derived
            .variables
            .extend(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
        derived
    }

    /// Look up a variable. Explicit variables shadow the built-in ones
    /// (`platform`, `package`, `version`, `direction`).
    pub fn variable(&self, name: &str) -> Option<String> {
        if let Some(value) = self.variables.get(name) {
            return Some(value.clone());
        }
        match name {
            "platform" => Some(self.platform.clone()),
            "package" => Some(self.package_name.clone()),
            "version" => self.package_version.clone(),
            "direction" => Some(self.direction.to_string()),
            _ => None,
        }
    }

    /// Whether a variable is set to something other than an empty or false-like value
    pub fn is_truthy(&self, name: &str) -> bool {
        self.variable(name).is_some_and(|v| {
            !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "" | "false" | "0" | "no" | "off"
            )
        })
    }

    /// The active platform id followed by its aliases
    pub fn platform_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.platform.as_str()).chain(self.platform_aliases.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> FlowContext {
        FlowContext::new("/ws", "/pkg", "claude", "@acme/tools")
    }

    #[test]
    fn test_builtin_variables() {
        let ctx = context();
        assert_eq!(ctx.variable("platform").as_deref(), Some("claude"));
        assert_eq!(ctx.variable("package").as_deref(), Some("@acme/tools"));
        assert_eq!(ctx.variable("direction").as_deref(), Some("install"));
        assert_eq!(ctx.variable("version"), None);
    }

    #[test]
    fn test_for_source_does_not_touch_base() {
        let base = context().with_variable("rootDir", ".claude");
        let derived = base.for_source([("name", "deploy")]);

        assert_eq!(derived.variable("name").as_deref(), Some("deploy"));
        assert_eq!(derived.variable("rootDir").as_deref(), Some(".claude"));
        assert_eq!(base.variable("name"), None);
    }

    #[test]
    fn test_is_truthy() {
        let ctx = context()
            .with_variable("prefix", "true")
            .with_variable("off", "false")
            .with_variable("empty", "");
        assert!(ctx.is_truthy("prefix"));
        assert!(!ctx.is_truthy("off"));
        assert!(!ctx.is_truthy("empty"));
        assert!(!ctx.is_truthy("unset"));
    }
}

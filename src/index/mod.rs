//! Workspace index
//!
//! Persisted record of what each installed package wrote, stored at
//! `.opkg/opkg.index.yaml`:
//!
//! ```yaml
//! packages:
//!   "@acme/tools":
//!     path: ~/src/packages/tools
//!     version: 1.2.0
//!     platforms: [claude, opencode]
//!     files:
//!       commands/deploy.md:
//!         - .claude/commands/deploy.md
//!       mcp.jsonc:
//!         - target: .opencode/opencode.json
//!           merge: deep
//!           keys: [mcp.server1]
//! ```
//!
//! Plain strings are whole-file (replace) targets. `path` is relative to
//! the workspace when the package lives inside it, `~/`-relative under the
//! home directory and absolute otherwise.

pub mod save;
pub mod uninstall;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::coordinator::{Ownership, SourceFilter};
use crate::error::{OpkgError, Result, fs as fs_error};
use crate::executor::ResolvedTargetMapping;
use crate::merge::{MergeStrategy, keys::keys_overlap};

/// Index location, relative to the workspace root
pub const INDEX_FILE: &str = ".opkg/opkg.index.yaml";

/// One recorded target of a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexTarget {
    Path(String),
    Tracked {
        target: String,
        merge: MergeStrategy,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keys: Option<Vec<String>>,
    },
}

impl IndexTarget {
    pub fn target(&self) -> &str {
        match self {
            Self::Path(target) | Self::Tracked { target, .. } => target,
        }
    }

    pub fn merge(&self) -> MergeStrategy {
        match self {
            Self::Path(_) => MergeStrategy::Replace,
            Self::Tracked { merge, .. } => *merge,
        }
    }

    pub fn to_mapping(&self, source: &str) -> ResolvedTargetMapping {
        match self {
            Self::Path(target) => ResolvedTargetMapping {
                source: source.to_string(),
                target: target.clone(),
                merge: MergeStrategy::Replace,
                keys: None,
            },
            Self::Tracked { target, merge, keys } => ResolvedTargetMapping {
                source: source.to_string(),
                target: target.clone(),
                merge: *merge,
                keys: keys.clone(),
            },
        }
    }
}

impl From<&ResolvedTargetMapping> for IndexTarget {
    fn from(mapping: &ResolvedTargetMapping) -> Self {
        match (mapping.merge, &mapping.keys) {
            (MergeStrategy::Replace, None) => Self::Path(mapping.target.clone()),
            (merge, keys) => Self::Tracked {
                target: mapping.target.clone(),
                merge,
                keys: keys.clone(),
            },
        }
    }
}

/// Everything one package wrote into the workspace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Package content root
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Platforms the package was installed for
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    /// Context variables the install ran with (such as `prefix`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub files: BTreeMap<String, Vec<IndexTarget>>,
}

impl IndexEntry {
    pub fn new(path: impl Into<String>, version: Option<String>) -> Self {
        Self {
            path: path.into(),
            version,
            ..Self::default()
        }
    }

    /// Add the mappings of one pass; a target already recorded for the same
    /// source is replaced
    pub fn record_mappings(&mut self, mapping: &BTreeMap<String, Vec<ResolvedTargetMapping>>) {
        for (source, targets) in mapping {
            let recorded = self.files.entry(source.clone()).or_default();
            for target in targets {
                let entry = IndexTarget::from(target);
                match recorded.iter_mut().find(|t| t.target() == entry.target()) {
                    Some(existing) => *existing = entry,
                    None => recorded.push(entry),
                }
            }
        }
    }

    /// Every recorded mapping, in source order
    pub fn mappings(&self) -> Vec<ResolvedTargetMapping> {
        self.files
            .iter()
            .flat_map(|(source, targets)| targets.iter().map(|t| t.to_mapping(source)))
            .collect()
    }

    /// Drop whatever this entry owns that `mapping` now owns
    fn release(&mut self, mapping: &ResolvedTargetMapping) {
        for targets in self.files.values_mut() {
            targets.retain_mut(|recorded| {
                if recorded.target() != mapping.target {
                    return true;
                }
                match (recorded, mapping.merge) {
                    (IndexTarget::Path(_), MergeStrategy::Replace) => false,
                    (
                        IndexTarget::Tracked {
                            merge: MergeStrategy::Replace,
                            ..
                        },
                        MergeStrategy::Replace,
                    ) => false,
                    (
                        IndexTarget::Tracked {
                            keys: Some(owned),
                            ..
                        },
                        MergeStrategy::Deep | MergeStrategy::Shallow,
                    ) => {
                        let claimed = mapping.keys.as_deref().unwrap_or_default();
                        owned.retain(|key| !claimed.iter().any(|other| keys_overlap(key, other)));
                        !owned.is_empty()
                    }
                    _ => true,
                }
            });
        }
        self.files.retain(|_, targets| !targets.is_empty());
    }
}

/// The persisted workspace index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceIndex {
    #[serde(default)]
    pub packages: BTreeMap<String, IndexEntry>,
}

impl WorkspaceIndex {
    pub fn path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(INDEX_FILE)
    }

    /// Load the index; a workspace without one has an empty index
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let path = Self::path(workspace_root);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| OpkgError::ConfigReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| OpkgError::ConfigParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, workspace_root: &Path) -> Result<()> {
        let path = Self::path(workspace_root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| fs_error::write_failed(parent, e))?;
        }
        let content = serde_yaml::to_string(self)?;
        fs::write(&path, content).map_err(|e| fs_error::write_failed(&path, e))
    }

    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.packages.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<IndexEntry> {
        self.packages.remove(name)
    }

    /// Store a package's entry, replacing its previous one. Targets (and
    /// overlapping keys) the package now owns are released by every other
    /// package.
    pub fn record(&mut self, name: &str, entry: IndexEntry) {
        let mappings = entry.mappings();
        for (other, recorded) in &mut self.packages {
            if other == name {
                continue;
            }
            for mapping in &mappings {
                recorded.release(mapping);
            }
        }
        self.packages.insert(name.to_string(), entry);
    }

    /// Ownership as seen by `package`: other packages' targets and keys,
    /// plus the keys `package` itself owned after its last install
    pub fn ownership(&self, package: &str) -> Ownership {
        self.ownership_within(package, &SourceFilter::default())
    }

    /// Like [`ownership`](Self::ownership), but only keys recorded for
    /// sources matching `filter` count as the package's previous keys
    pub fn ownership_within(&self, package: &str, filter: &SourceFilter) -> Ownership {
        let mut ownership = Ownership::new();
        for (name, entry) in &self.packages {
            for mapping in entry.mappings() {
                match (name == package, mapping.merge) {
                    (true, MergeStrategy::Deep | MergeStrategy::Shallow) if filter.matches(&mapping.source) => {
                        ownership.previous_keys(mapping.target, mapping.keys.unwrap_or_default());
                    }
                    (false, MergeStrategy::Replace) => ownership.claim_file(mapping.target, name.as_str()),
                    (false, MergeStrategy::Deep | MergeStrategy::Shallow) => {
                        ownership.claim_keys(mapping.target, name.as_str(), mapping.keys.unwrap_or_default());
                    }
                    _ => {}
                }
            }
        }
        ownership
    }
}

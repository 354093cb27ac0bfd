//! Resolved packages and their content files
//!
//! A package is a directory of universal resources with an optional
//! `opkg.yaml` manifest naming it:
//!
//! ```yaml
//! name: "@acme/tools"
//! version: "1.2.0"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::{OpkgError, Result, fs as fs_error};
use crate::path_utils::{canonical_dir, to_forward_slashes};

/// Package manifest file name
pub const MANIFEST_FILE: &str = "opkg.yaml";

/// Directories never treated as package content
const IGNORED_DIRS: &[&str] = &[".git", ".opkg", "node_modules"];

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    name: Option<String>,
    version: Option<String>,
}

/// A package whose location, name and version are known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    /// Content root
    pub root: PathBuf,
    pub name: String,
    pub version: Option<String>,
    /// Lower priorities install first
    pub priority: i32,
}

impl ResolvedPackage {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            version: None,
            priority: 0,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Resolve a local package directory, reading `opkg.yaml` when present.
    ///
    /// Without a manifest name the directory name is used.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(fs_error::not_found(dir));
        }
        let root = canonical_dir(dir);

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = if manifest_path.is_file() {
            let content =
                fs::read_to_string(&manifest_path).map_err(|e| fs_error::read_failed(&manifest_path, e))?;
            serde_yaml::from_str::<Option<Manifest>>(&content)
                .map_err(|e| OpkgError::ConfigParseFailed {
                    path: manifest_path.display().to_string(),
                    reason: e.to_string(),
                })?
                .unwrap_or_default()
        } else {
            Manifest::default()
        };

        let name = manifest
            .name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
            .ok_or_else(|| OpkgError::ConfigParseFailed {
                path: manifest_path.display().to_string(),
                reason: "package has no name".to_string(),
            })?;

        Ok(Self {
            root,
            name,
            version: manifest.version,
            priority: 0,
        })
    }

    /// Every content file, package-relative with forward slashes, sorted
    pub fn files(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(fs_error::not_found(&self.root));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(e.file_type().is_dir()
                        && IGNORED_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
            });

        for entry in walker {
            let entry = entry.map_err(|e| fs_error::read_failed(&self.root, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative = to_forward_slashes(relative);
            if relative != MANIFEST_FILE {
                files.push(relative);
            }
        }

        files.sort();
        Ok(files)
    }
}

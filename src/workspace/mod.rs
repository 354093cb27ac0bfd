//! Workspace handle
//!
//! ## Workspace Structure
//!
//! ```text
//! .opkg/
//! ├── opkg.index.yaml   # What each installed package wrote
//! └── platforms.jsonc   # Optional platform overrides
//! ```

use std::path::{Path, PathBuf};

use crate::error::{OpkgError, Result, fs as fs_error};
use crate::index::WorkspaceIndex;
use crate::path_utils::canonical_dir;
use crate::platform::{PlatformLoader, PlatformRegistry};

/// opkg workspace directory name
pub const WORKSPACE_DIR: &str = ".opkg";

/// An opened workspace: its root, the platform registry in effect and the
/// index of installed packages
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub registry: PlatformRegistry,
    pub index: WorkspaceIndex,
}

impl Workspace {
    /// Open a workspace, loading platform overrides from the workspace and
    /// the user config directory
    pub fn open(root: &Path) -> Result<Self> {
        Self::open_with(root, PlatformLoader::new(root))
    }

    pub fn open_with(root: &Path, loader: PlatformLoader) -> Result<Self> {
        if !root.is_dir() {
            return Err(fs_error::not_found(root));
        }
        let registry = loader.load()?;
        let index = WorkspaceIndex::load(root)?;
        tracing::debug!(
            root = %root.display(),
            platforms = registry.all().len(),
            packages = index.packages.len(),
            "workspace opened"
        );
        Ok(Self {
            root: root.to_path_buf(),
            registry,
            index,
        })
    }

    /// The explicit workspace directory, or the current directory
    pub fn resolve_root(path: Option<PathBuf>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path,
            None => std::env::current_dir().map_err(|e| OpkgError::IoError {
                message: format!("Failed to get current directory: {e}"),
            })?,
        };
        if !path.is_dir() {
            return Err(fs_error::not_found(&path));
        }
        Ok(canonical_dir(&path))
    }

    pub fn opkg_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn save_index(&self) -> Result<()> {
        self.index.save(&self.root)
    }
}

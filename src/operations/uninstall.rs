//! Uninstall operation

use crate::cli::UninstallArgs;
use crate::error::Result;
use crate::index::uninstall::{UninstallReport, uninstall};
use crate::workspace::Workspace;

/// Configuration options for uninstall
#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    pub dry_run: bool,
}

impl From<&UninstallArgs> for UninstallOptions {
    fn from(args: &UninstallArgs) -> Self {
        Self { dry_run: args.dry_run }
    }
}

/// High-level uninstall operation
pub struct UninstallOperation<'a> {
    workspace: &'a mut Workspace,
    options: UninstallOptions,
}

impl<'a> UninstallOperation<'a> {
    pub fn new(workspace: &'a mut Workspace, options: UninstallOptions) -> Self {
        Self { workspace, options }
    }

    pub fn execute(&mut self, name: &str) -> Result<UninstallReport> {
        let workspace = &mut *self.workspace;
        let report = uninstall(
            &mut workspace.index,
            &workspace.registry,
            &workspace.root,
            name,
            self.options.dry_run,
        )?;
        if !self.options.dry_run {
            workspace.save_index()?;
        }
        Ok(report)
    }
}

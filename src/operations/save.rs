//! Save operation: detect workspace edits and write them back

use crate::cli::SaveArgs;
use crate::error::{OpkgError, Result};
use crate::index::save::{SaveOptions, SaveReport, save};
use crate::workspace::Workspace;

impl From<&SaveArgs> for SaveOptions {
    fn from(args: &SaveArgs) -> Self {
        Self {
            platforms: args.platforms.clone(),
            apply: args.apply,
        }
    }
}

pub struct SaveOperation<'a> {
    workspace: &'a Workspace,
    options: SaveOptions,
}

impl<'a> SaveOperation<'a> {
    pub fn new(workspace: &'a Workspace, options: SaveOptions) -> Self {
        Self { workspace, options }
    }

    pub fn execute(&self, name: &str) -> Result<SaveReport> {
        let entry = self
            .workspace
            .index
            .get(name)
            .ok_or_else(|| OpkgError::PackageNotInstalled {
                name: name.to_string(),
            })?;
        save(
            &self.workspace.registry,
            &self.workspace.root,
            name,
            entry,
            &self.options,
        )
    }
}

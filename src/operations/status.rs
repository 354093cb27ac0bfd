//! Status of every installed package

use crate::index::save::{PackageStatus, status};
use crate::workspace::Workspace;

pub struct StatusOperation<'a> {
    workspace: &'a Workspace,
}

impl<'a> StatusOperation<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self { workspace }
    }

    pub fn execute(&self) -> Vec<PackageStatus> {
        self.workspace
            .index
            .packages
            .iter()
            .map(|(name, entry)| status(&self.workspace.registry, &self.workspace.root, name, entry))
            .collect()
    }
}

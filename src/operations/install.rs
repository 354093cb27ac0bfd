//! Install operation
//!
//! Packages install in ascending priority; each runs one coordinator pass
//! per target platform. A package's index entry is replaced only after all
//! of its passes succeeded. A dry-run records into a scratch copy of the
//! index that is never saved, so later packages still see earlier claims.
//!
//! With a source filter, only the package's matching sources are
//! reinstalled; what its other sources produced stays in place and in the
//! index.

use std::collections::BTreeMap;

use crate::cli::InstallArgs;
use crate::coordinator::{Conflict, Coordinator, FlowFailure, PassOptions, PassResult, SourceFilter};
use crate::error::{OpkgError, Result};
use crate::executor::Staged;
use crate::index::{IndexEntry, WorkspaceIndex, uninstall::remove_stale};
use crate::package::ResolvedPackage;
use crate::path_utils::to_index_path;
use crate::platform::Platform;
use crate::workspace::Workspace;

/// Configuration options for installation
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub platforms: Vec<String>,
    pub dry_run: bool,
    pub prefix: bool,
    pub filter: Option<String>,
    pub fail_fast: bool,
}

impl From<&InstallArgs> for InstallOptions {
    fn from(args: &InstallArgs) -> Self {
        Self {
            platforms: args.platforms.clone(),
            dry_run: args.dry_run,
            prefix: args.prefix,
            filter: args.only.clone(),
            fail_fast: args.fail_fast,
        }
    }
}

/// Outcome for one package across its platform passes
#[derive(Debug)]
pub struct PackageInstall {
    pub name: String,
    pub version: Option<String>,
    pub passes: Vec<PassResult>,
    /// Targets of the previous install removed because they are no longer produced
    pub stale_removed: Vec<String>,
}

impl PackageInstall {
    pub fn success(&self) -> bool {
        self.passes.iter().all(|p| p.success)
    }

    pub fn files_written(&self) -> usize {
        self.passes.iter().map(|p| p.files_written).sum()
    }

    pub fn files_processed(&self) -> usize {
        self.passes.iter().map(|p| p.files_processed).sum()
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.passes.iter().flat_map(|p| &p.conflicts)
    }

    pub fn errors(&self) -> impl Iterator<Item = &FlowFailure> {
        self.passes.iter().flat_map(|p| &p.errors)
    }
}

#[derive(Debug, Default)]
pub struct InstallReport {
    pub packages: Vec<PackageInstall>,
    pub dry_run: bool,
}

impl InstallReport {
    pub fn failed(&self) -> usize {
        self.packages.iter().filter(|p| !p.success()).count()
    }

    /// `PartialFailure` when any package failed
    pub fn into_result(self, total: usize) -> Result<Self> {
        let failed = self.failed();
        if failed > 0 {
            return Err(OpkgError::PartialFailure { failed, total });
        }
        Ok(self)
    }
}

/// High-level install operation
pub struct InstallOperation<'a> {
    workspace: &'a mut Workspace,
    options: InstallOptions,
}

impl<'a> InstallOperation<'a> {
    pub fn new(workspace: &'a mut Workspace, options: InstallOptions) -> Self {
        Self { workspace, options }
    }

    fn target_platforms(&self) -> Result<Vec<Platform>> {
        let registry = &self.workspace.registry;
        let platforms = if self.options.platforms.is_empty() {
            registry.detect_all(&self.workspace.root)
        } else {
            registry.resolve_ids(&self.options.platforms)?
        };
        if platforms.is_empty() {
            return Err(OpkgError::NoPlatformsDetected);
        }
        Ok(platforms.into_iter().cloned().collect())
    }

    fn variables(&self) -> BTreeMap<String, String> {
        let mut variables = BTreeMap::new();
        if self.options.prefix {
            variables.insert("prefix".to_string(), "true".to_string());
        }
        variables
    }

    /// Install packages; failures are reported per package, not returned
    pub fn execute(&mut self, mut packages: Vec<ResolvedPackage>) -> Result<InstallReport> {
        let platforms = self.target_platforms()?;
        packages.sort_by_key(|p| p.priority);

        let mut report = InstallReport {
            dry_run: self.options.dry_run,
            ..InstallReport::default()
        };
        let mut scratch = self.options.dry_run.then(|| self.workspace.index.clone());
        let mut staged = Staged::default();

        for package in &packages {
            let outcome = self.install_one(package, &platforms, scratch.as_mut(), &mut staged)?;
            let failed = !outcome.success();
            report.packages.push(outcome);

            if failed && self.options.fail_fast {
                tracing::warn!(package = %package.name, "stopping at first failed package");
                break;
            }
        }

        Ok(report)
    }

    /// Install one package, recording into `scratch` instead of the
    /// workspace index when given
    fn install_one(
        &mut self,
        package: &ResolvedPackage,
        platforms: &[Platform],
        scratch: Option<&mut WorkspaceIndex>,
        staged: &mut Staged,
    ) -> Result<PackageInstall> {
        let options = PassOptions {
            dry_run: self.options.dry_run,
            filter: self.options.filter.clone(),
            variables: self.variables(),
        };
        let filter = SourceFilter::new(options.filter.as_deref())?;
        let dry_run = scratch.is_some();
        let index = match scratch {
            Some(index) => index,
            None => &mut self.workspace.index,
        };

        let mut ownership = index.ownership_within(&package.name, &filter);
        let coordinator = Coordinator::new(&self.workspace.registry, &self.workspace.root);
        let passes: Vec<PassResult> = platforms
            .iter()
            .map(|platform| coordinator.run(package, platform, &options, &mut ownership, staged))
            .collect();

        let mut outcome = PackageInstall {
            name: package.name.clone(),
            version: package.version.clone(),
            passes,
            stale_removed: Vec::new(),
        };
        if !outcome.success() {
            return Ok(outcome);
        }

        let mut entry = IndexEntry::new(
            to_index_path(&package.root, &self.workspace.root),
            package.version.clone(),
        );
        entry.platforms = platforms.iter().map(|p| p.id.clone()).collect();
        if filter.is_set()
            && let Some(previous) = index.get(&package.name)
        {
            entry.files = previous.files.clone();
            entry.files.retain(|source, _| !filter.matches(source));
            for id in &previous.platforms {
                if !entry.platforms.contains(id) {
                    entry.platforms.push(id.clone());
                }
            }
        }
        entry.variables = options.variables;
        for pass in &outcome.passes {
            entry.record_mappings(&pass.file_mapping);
        }

        outcome.stale_removed = remove_stale(
            index,
            &self.workspace.registry,
            &self.workspace.root,
            &package.name,
            &entry,
            dry_run,
        )?;
        index.record(&package.name, entry);
        if !dry_run {
            self.workspace.save_index()?;
        }

        tracing::info!(
            package = %package.name,
            written = outcome.files_written(),
            stale = outcome.stale_removed.len(),
            dry_run,
            "package installed"
        );
        Ok(outcome)
    }
}

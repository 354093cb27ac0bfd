//! Install command CLI wrapper

use std::path::PathBuf;

use console::Style;

use super::helpers::{open_workspace, plural, print_conflict, print_failure};
use crate::cli::InstallArgs;
use crate::error::Result;
use crate::operations::{InstallOperation, InstallOptions, PackageInstall};
use crate::package::ResolvedPackage;

fn print_package(package: &PackageInstall, dry_run: bool) {
    let status = if !package.success() {
        Style::new().red().bold().apply_to("failed")
    } else if dry_run {
        Style::new().cyan().bold().apply_to("would install")
    } else {
        Style::new().green().bold().apply_to("installed")
    };
    let version = package
        .version
        .as_deref()
        .map(|v| format!(" {v}"))
        .unwrap_or_default();

    println!(
        "{} {}{}",
        status,
        Style::new().bold().apply_to(&package.name),
        version
    );
    for pass in &package.passes {
        println!(
            "  {}: {} processed, {} written",
            pass.platform,
            plural(pass.files_processed, "file"),
            pass.files_written
        );
    }
    let removed = if dry_run { "would remove stale" } else { "removed stale" };
    for target in &package.stale_removed {
        println!("  {removed} {target}");
    }
    package.conflicts().for_each(print_conflict);
    package.errors().for_each(print_failure);
}

/// Run install command
pub fn run(workspace: Option<PathBuf>, args: InstallArgs) -> Result<()> {
    let mut workspace = open_workspace(workspace)?;

    let packages = args
        .packages
        .iter()
        .enumerate()
        .map(|(position, dir)| {
            ResolvedPackage::from_dir(dir).map(|p| p.with_priority(i32::try_from(position).unwrap_or(i32::MAX)))
        })
        .collect::<Result<Vec<_>>>()?;
    let total = packages.len();

    let options = InstallOptions::from(&args);
    let report = InstallOperation::new(&mut workspace, options).execute(packages)?;

    for package in &report.packages {
        print_package(package, report.dry_run);
    }
    report.into_result(total)?;
    Ok(())
}

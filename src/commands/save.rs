//! Save command CLI wrapper

use std::path::PathBuf;

use console::Style;

use super::helpers::{open_workspace, print_failure};
use crate::cli::SaveArgs;
use crate::error::Result;
use crate::index::save::SaveOptions;
use crate::operations::SaveOperation;

/// Run save command
pub fn run(workspace: Option<PathBuf>, args: SaveArgs) -> Result<()> {
    let workspace = open_workspace(workspace)?;
    let report = SaveOperation::new(&workspace, SaveOptions::from(&args)).execute(&args.name)?;

    if report.pending.is_empty() {
        println!("{} has no workspace edits", Style::new().bold().apply_to(&report.package));
        return Ok(());
    }

    println!(
        "{} has {} modified target(s):",
        Style::new().bold().apply_to(&report.package),
        report.pending.len()
    );
    for change in &report.pending {
        println!(
            "  {} {} -> {} [{}]",
            Style::new().yellow().apply_to("modified"),
            change.target,
            change.source,
            change.platform
        );
    }
    for source in &report.applied {
        println!("  {} {source}", Style::new().green().apply_to("saved"));
    }
    report.failures.iter().for_each(print_failure);
    Ok(())
}

//! Uninstall command CLI wrapper

use std::path::PathBuf;

use console::Style;

use super::helpers::open_workspace;
use crate::cli::UninstallArgs;
use crate::error::Result;
use crate::operations::{UninstallOperation, UninstallOptions};

/// Run uninstall command
pub fn run(workspace: Option<PathBuf>, args: UninstallArgs) -> Result<()> {
    let mut workspace = open_workspace(workspace)?;
    let options = UninstallOptions::from(&args);
    let report = UninstallOperation::new(&mut workspace, options).execute(&args.name)?;

    let verb = if args.dry_run { "Would uninstall" } else { "Uninstalled" };
    println!("{} {}", verb, Style::new().bold().apply_to(&report.package));

    let dim = Style::new().dim();
    for path in &report.removed {
        println!("  {} {path}", Style::new().red().apply_to("removed"));
    }
    for path in &report.rewritten {
        println!("  {} {path}", Style::new().yellow().apply_to("updated"));
    }
    for path in &report.kept {
        println!("  {} {path} {}", dim.apply_to("kept"), dim.apply_to("(owned by another package)"));
    }
    for path in &report.missing {
        println!("  {} {path}", dim.apply_to("missing"));
    }
    Ok(())
}

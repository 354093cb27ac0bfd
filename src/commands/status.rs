//! Status command CLI wrapper

use std::path::PathBuf;

use console::Style;

use super::helpers::open_workspace;
use crate::cli::StatusArgs;
use crate::error::Result;
use crate::index::save::ChangeState;
use crate::operations::StatusOperation;

fn state_style(state: ChangeState) -> Style {
    match state {
        ChangeState::Clean => Style::new().green(),
        ChangeState::Modified => Style::new().yellow(),
        ChangeState::Missing => Style::new().red(),
    }
}

/// Run status command
pub fn run(workspace: Option<PathBuf>, args: StatusArgs) -> Result<()> {
    let workspace = open_workspace(workspace)?;
    let statuses = StatusOperation::new(&workspace).execute();

    if statuses.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }

    for package in statuses {
        let version = package.version.as_deref().unwrap_or("-");
        println!("{} {}", Style::new().bold().yellow().apply_to(&package.name), version);

        let mut clean = 0;
        for mapping in &package.mappings {
            if mapping.state == ChangeState::Clean && !args.all {
                clean += 1;
                continue;
            }
            println!(
                "  {:<9} {} ({})",
                state_style(mapping.state).apply_to(mapping.state.to_string()),
                mapping.target,
                mapping.merge
            );
        }
        if clean > 0 {
            println!("  {} clean target(s)", clean);
        }
    }
    Ok(())
}

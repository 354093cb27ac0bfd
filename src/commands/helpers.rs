//! Command helper utilities

use std::path::PathBuf;

use console::Style;

use crate::coordinator::{Conflict, FlowFailure};
use crate::error::Result;
use crate::workspace::Workspace;

/// Open the workspace named on the command line (or the current directory)
pub fn open_workspace(workspace: Option<PathBuf>) -> Result<Workspace> {
    let root = Workspace::resolve_root(workspace)?;
    Workspace::open(&root)
}

pub fn print_conflict(conflict: &Conflict) {
    println!(
        "  {} {}",
        Style::new().yellow().bold().apply_to("conflict"),
        conflict.message
    );
}

pub fn print_failure(failure: &FlowFailure) {
    let location = match &failure.target {
        Some(target) => format!("{} -> {}", failure.source, target),
        None => failure.source.clone(),
    };
    println!(
        "  {} {} ({}): {}",
        Style::new().red().bold().apply_to("error"),
        location,
        failure.kind,
        failure.message
    );
}

/// "1 file" / "3 files"
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "file"), "1 file");
        assert_eq!(plural(0, "file"), "0 files");
        assert_eq!(plural(3, "conflict"), "3 conflicts");
    }
}

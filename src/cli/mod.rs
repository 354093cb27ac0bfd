//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - install: Install command arguments
//! - uninstall: Uninstall command arguments
//! - save: Save command arguments
//! - status: Status command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod install;
pub mod save;
pub mod status;
pub mod uninstall;

pub use install::InstallArgs;
pub use save::SaveArgs;
pub use status::StatusArgs;
pub use uninstall::UninstallArgs;

/// opkg - AI assistant resource package manager
///
/// Install universal resource packages into the layouts of AI coding tools.
#[derive(Parser, Debug)]
#[command(
    name = "opkg",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Flow-based package manager for AI coding assistant resources",
    long_about = "opkg installs platform-agnostic resource packages (commands, rules, agents, skills, \
                  MCP servers) into the layouts of AI coding tools (Claude, Cursor, OpenCode, ...), \
                  tracks exactly what each package wrote, and can uninstall cleanly or save \
                  workspace edits back into the package.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  opkg install ./tools                \x1b[90m# Install for every detected platform\x1b[0m\n   \
                  opkg install ./tools --for claude   \x1b[90m# Install only for Claude Code\x1b[0m\n   \
                  opkg status                         \x1b[90m# Show clean/modified/missing targets\x1b[0m\n   \
                  opkg save tools --apply             \x1b[90m# Write workspace edits back\x1b[0m\n   \
                  opkg uninstall tools                \x1b[90m# Remove everything tools installed\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Workspace directory (defaults to current directory)
    #[arg(long, short = 'w', global = true, env = "OPKG_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install packages from local directories
    Install(InstallArgs),

    /// Remove a package's files, sections and keys from the workspace
    Uninstall(UninstallArgs),

    /// Compare workspace targets with the package and save edits back
    Save(SaveArgs),

    /// Show the state of every installed target
    Status(StatusArgs),
}

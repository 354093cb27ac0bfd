//! opkg - AI assistant resource package manager
//!
//! Installs universal resource packages into the layouts of AI coding
//! platforms (Claude, Cursor, OpenCode, etc.) and tracks what each wrote.

use std::process::ExitCode;

use clap::Parser;
use miette::Diagnostic;

use opkg::cli::{Cli, Commands};
use opkg::{OpkgError, commands, logging};

fn run(cli: Cli) -> Result<(), OpkgError> {
    match cli.command {
        Commands::Install(args) => commands::install::run(cli.workspace, args),
        Commands::Uninstall(args) => commands::uninstall::run(cli.workspace, args),
        Commands::Save(args) => commands::save::run(cli.workspace, args),
        Commands::Status(args) => commands::status::run(cli.workspace, args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(help) = e.help() {
                eprintln!("  help: {help}");
            }
            ExitCode::FAILURE
        }
    }
}

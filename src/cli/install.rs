use clap::Parser;
use std::path::PathBuf;

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                   Install a local package:\n    opkg install ./my-package\n\n\
                   Install several packages, stopping at the first failure:\n    opkg install ./a ./b --fail-fast\n\n\
                   Install for specific platforms:\n    opkg install ./pkg --for cursor opencode\n\n\
                   Prefix installed file names with the package name:\n    opkg install ./pkg --prefix\n\n\
                   Only install commands:\n    opkg install ./pkg --only 'commands/**'")]
pub struct InstallArgs {
    /// Package directories (each may contain an opkg.yaml with name and version)
    #[arg(required = true, value_name = "PACKAGE_DIR")]
    pub packages: Vec<PathBuf>,

    /// Install only for specific platforms (e.g., --for cursor opencode)
    #[arg(long = "for", short = 'f', value_name = "PLATFORM", num_args = 1..)]
    pub platforms: Vec<String>,

    /// Show what would be installed without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Prefix wildcard-derived file names with the package name
    #[arg(long)]
    pub prefix: bool,

    /// Only install package files matching this glob
    #[arg(long, value_name = "GLOB")]
    pub only: Option<String>,

    /// Stop at the first package that fails
    #[arg(long)]
    pub fail_fast: bool,
}

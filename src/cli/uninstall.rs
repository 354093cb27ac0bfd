use clap::Parser;

/// Arguments for the uninstall command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Uninstall a package:\n    opkg uninstall my-package\n\n\
                  Preview what would be removed:\n    opkg uninstall @acme/tools --dry-run")]
pub struct UninstallArgs {
    /// Installed package name
    pub name: String,

    /// Show what would be removed without removing anything
    #[arg(long)]
    pub dry_run: bool,
}

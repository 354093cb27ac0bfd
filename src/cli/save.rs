use clap::Parser;

/// Arguments for the save command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  List workspace edits to a package:\n    opkg save my-package\n\n\
                  Save Claude edits back into the package:\n    opkg save my-package --for claude --apply")]
pub struct SaveArgs {
    /// Installed package name
    pub name: String,

    /// Only compare targets of these platforms
    #[arg(long = "for", short = 'f', value_name = "PLATFORM", num_args = 1..)]
    pub platforms: Vec<String>,

    /// Write pending changes into the package sources
    #[arg(long)]
    pub apply: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_save() {
        let cli = super::super::Cli::try_parse_from(["opkg", "save", "pkg", "--for", "claude", "--apply"]).unwrap();
        match cli.command {
            super::super::Commands::Save(args) => {
                assert_eq!(args.name, "pkg");
                assert_eq!(args.platforms, vec!["claude"]);
                assert!(args.apply);
            }
            _ => panic!("Expected Save command"),
        }
    }
}

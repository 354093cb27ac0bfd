use clap::Parser;

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Also list clean targets
    #[arg(long, short = 'a')]
    pub all: bool,
}

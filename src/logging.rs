//! Log setup for the CLI
//!
//! `OPKG_LOG` takes an `EnvFilter` directive (`opkg=debug`, `trace`, ...);
//! without it only warnings are shown, or debug output for opkg with `-v`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "OPKG_LOG";

/// Filter used when `OPKG_LOG` is unset
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "warn,opkg=debug" } else { "warn" }
}

/// Install the global subscriber, writing to stderr. Calling it twice is a no-op.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

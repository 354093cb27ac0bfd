//! Error types and handling for opkg
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Sub-modules hold convenience constructors by error domain:
//! - [`fs`]: File system errors
//! - [`flow`]: Pattern resolution and flow execution errors

pub mod flow;
pub mod fs;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for opkg operations
#[derive(Error, Diagnostic, Debug)]
pub enum OpkgError {
    // Pattern resolution errors
    #[error("Unresolved template variable '{{{variable}}}' in pattern '{pattern}'")]
    #[diagnostic(
        code(opkg::pattern::unresolved_variable),
        help("Define the variable in the platform's `variables` table or the install options")
    )]
    PatternResolution { pattern: String, variable: String },

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    #[diagnostic(code(opkg::pattern::invalid_glob))]
    InvalidPattern { pattern: String, reason: String },

    #[error("No switch case matches '{value}' for variable '{variable}'")]
    #[diagnostic(
        code(opkg::flow::switch_unmatched),
        help("Add a matching case or a `default` to the switch")
    )]
    SwitchUnmatched { variable: String, value: String },

    // Flow execution errors
    #[error("Flow execution failed for '{source_path}': {reason}")]
    #[diagnostic(code(opkg::flow::execution))]
    FlowExecution { source_path: String, reason: String },

    #[error("Failed to parse '{path}' as {format}: {reason}")]
    #[diagnostic(code(opkg::merge::parse_failed))]
    DocumentParse {
        path: String,
        format: String,
        reason: String,
    },

    #[error("Cannot extract keys from '{path}' installed with '{strategy}' merge")]
    #[diagnostic(
        code(opkg::merge::not_key_trackable),
        help("Only deep and shallow merges record the keys a package owns")
    )]
    NotKeyTrackable { path: String, strategy: String },

    #[error("Unknown transform '{name}'")]
    #[diagnostic(
        code(opkg::flow::unknown_transform),
        help(
            "Known transforms: filter-empty, filter-null, sort-keys, platform-frontmatter, markdown-to-toml"
        )
    )]
    UnknownTransform { name: String },

    // Platform errors
    #[error("Platform not supported: {platform}")]
    #[diagnostic(
        code(opkg::platform::not_supported),
        help("Supported platforms: claude, cursor, windsurf, opencode, copilot, ...")
    )]
    PlatformNotSupported { platform: String },

    #[error("No platforms detected in workspace")]
    #[diagnostic(
        code(opkg::platform::none_detected),
        help("Create a platform directory (e.g., .claude/, .cursor/) or pass --for")
    )]
    NoPlatformsDetected,

    #[error("Failed to load platform configuration: {message}")]
    #[diagnostic(code(opkg::platform::config_failed))]
    PlatformConfigFailed { message: String },

    // Package and index errors
    #[error("Package '{name}' is not installed")]
    #[diagnostic(
        code(opkg::index::not_installed),
        help("Run 'opkg status' to list installed packages")
    )]
    PackageNotInstalled { name: String },

    #[error("{failed} of {total} package installs failed")]
    #[diagnostic(code(opkg::install::partial_failure))]
    PartialFailure { failed: usize, total: usize },

    // Configuration errors
    #[error("Failed to parse configuration file: {path}")]
    #[diagnostic(code(opkg::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(opkg::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(opkg::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}")]
    #[diagnostic(code(opkg::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(opkg::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(opkg::fs::io_error))]
    IoError { message: String },
}

impl OpkgError {
    /// Short machine-readable category used in pass reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PatternResolution { .. } | Self::InvalidPattern { .. } => "pattern",
            Self::SwitchUnmatched { .. } | Self::UnknownTransform { .. } => "flow",
            Self::FlowExecution { .. } | Self::DocumentParse { .. } | Self::NotKeyTrackable { .. } => {
                "execution"
            }
            Self::PlatformNotSupported { .. }
            | Self::NoPlatformsDetected
            | Self::PlatformConfigFailed { .. } => "platform",
            Self::PackageNotInstalled { .. } | Self::PartialFailure { .. } => "package",
            Self::ConfigParseFailed { .. } | Self::ConfigReadFailed { .. } => "config",
            Self::FileNotFound { .. }
            | Self::FileReadFailed { .. }
            | Self::FileWriteFailed { .. }
            | Self::IoError { .. } => "io",
        }
    }
}

impl From<std::io::Error> for OpkgError {
    fn from(err: std::io::Error) -> Self {
        OpkgError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for OpkgError {
    fn from(err: serde_yaml::Error) -> Self {
        OpkgError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for OpkgError {
    fn from(err: serde_json::Error) -> Self {
        OpkgError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, OpkgError>;

//! Operations module
//!
//! High-level workflows over an opened [`Workspace`](crate::workspace::Workspace):
//! - InstallOperation: install resolved packages into platform layouts
//! - UninstallOperation: remove everything a package installed
//! - SaveOperation: find (and optionally save back) workspace edits
//! - StatusOperation: clean / modified / missing per recorded target

pub mod install;
pub mod save;
pub mod status;
pub mod uninstall;

pub use install::{InstallOperation, InstallOptions, InstallReport, PackageInstall};
pub use save::SaveOperation;
pub use status::StatusOperation;
pub use uninstall::{UninstallOperation, UninstallOptions};

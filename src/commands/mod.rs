//! Command implementations for the opkg CLI

pub mod helpers;
pub mod install;
pub mod save;
pub mod status;
pub mod uninstall;

//! opkg - flow-based package manager for AI coding assistant resources
//!
//! A package holds platform-agnostic ("universal") resources: commands,
//! rules, agents, skills, MCP server definitions. Declarative flows map them
//! into each platform's own layout, merging into shared config files where
//! several packages meet, and the workspace index records exactly what each
//! package wrote so it can be uninstalled cleanly or its edits saved back.
//!
//! Components, leaf first:
//! - [`platform`]: platform definitions, overrides and flow ordering
//! - [`flow`]: the flow rule model, contexts, switches, conditions, transforms
//! - [`pattern`]: resolving flow patterns against package files
//! - [`merge`]: structured-document merging and key tracking
//! - [`executor`]: running one flow for one source file
//! - [`coordinator`]: one platform pass for one package
//! - [`index`]: the persisted workspace index, uninstall and save
//! - [`operations`]: install / uninstall / save / status workflows

pub mod cli;
pub mod commands;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod flow;
pub mod hash;
pub mod index;
pub mod logging;
pub mod merge;
pub mod operations;
pub mod package;
pub mod path_utils;
pub mod pattern;
pub mod platform;
pub mod workspace;

pub use error::{OpkgError, Result};

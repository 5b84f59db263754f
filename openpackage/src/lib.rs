#![deny(missing_docs)]

//! # openpackage
//!
//! The install core of the openpackage package manager: a wave-based BFS
//! dependency resolver with per-package version solving, a flow engine that
//! maps source patterns to workspace targets, a format converter that lifts
//! vendor layouts into the universal format, and a wave-parallel installer
//! with file-level ownership tracking against a persistent workspace index.
//!
//! The transports (registry HTTP, git) and the command-line surface live
//! elsewhere; this crate consumes them through the seams in [`fetch`][] and
//! [`installer::output`][].
//!
//! The typical entry point is [`install::install_workspace`][].

pub mod cache;
pub mod context;
pub mod convert;
pub mod errors;
pub mod fetch;
pub mod flow;
pub mod fsutil;
pub mod index;
pub mod install;
pub mod installer;
pub mod manifest;
pub mod ownership;
pub mod resolver;
pub mod solver;
pub mod source;
pub mod spec;
pub mod strategy;
#[cfg(test)]
mod tests;

pub use errors::{OpError, OpResult};
pub use install::{install_workspace, resolve_workspace, InstallServices};
pub use installer::{InstallOptions, OutputPort};
pub use resolver::ResolveOptions;

/// A map with a deterministic iteration order (re-exported from the schema
/// crate so every layer agrees)
pub use openpackage_schema::SortedMap;

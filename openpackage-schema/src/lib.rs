#![deny(missing_docs)]

//! # openpackage-schema
//!
//! This crate exists to serialize and deserialize the on-disk formats that
//! openpackage owns: the package manifest (`openpackage.yml`), the workspace
//! index (`.openpackage/openpackage.index.yml`), and the machine-readable
//! install receipt. Ideally it should be reasonably forward and backward
//! compatible with different versions of these formats; legacy manifest keys
//! are migrated on read and only the current form is ever written back.

mod index;
mod manifest;
mod receipt;

pub use index::*;
pub use manifest::*;
pub use receipt::*;

/// A map with a deterministic iteration order
///
/// All on-disk maps use this so that serialization is stable across runs
/// (index diffs stay reviewable, tests don't flake on ordering).
pub type SortedMap<K, V> = std::collections::BTreeMap<K, V>;

/// The name of the package manifest file
pub const MANIFEST_FILE_NAME: &str = "openpackage.yml";
/// The workspace-relative directory openpackage keeps its state in
pub const WORKSPACE_STATE_DIR: &str = ".openpackage";
/// The file name of the workspace index inside [`WORKSPACE_STATE_DIR`][]
pub const INDEX_FILE_NAME: &str = "openpackage.index.yml";

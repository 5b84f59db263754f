//! The install receipt
//!
//! A report of what an install run did, suitable for serializing for other
//! tools (or a `--json` surface) to consume. The per-package
//! [`PackageReport`][] is the typed contract that strategies hand up to the
//! wave installer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::SortedMap;

/// A report of everything one install run did
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct InstallReceipt {
    /// How many packages were installed
    pub installed: usize,
    /// How many packages failed
    pub failed: usize,
    /// How many packages were skipped (already installed, marketplace
    /// terminals, ...)
    pub skipped: usize,
    /// Per-package reports, in install order
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<PackageReport>,
    /// Run-level warnings (resolution warnings, cycle reports, ...)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// What happened to one package
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PackageReport {
    /// Display name of the package
    pub name: String,
    /// The version it resolved to, if any
    ///
    /// This is a String because the receipt may be read by tools with looser
    /// version handling than semver.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The outcome for this package
    pub status: ReportStatus,
    /// How many source files the strategy looked at
    pub files_processed: usize,
    /// How many workspace files were actually written
    pub files_written: usize,
    /// Source path → workspace paths written for it
    #[serde(default)]
    #[serde(skip_serializing_if = "SortedMap::is_empty")]
    pub file_mapping: SortedMap<String, Vec<String>>,
    /// Conflicts encountered (denied writes), as human-readable lines
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    /// Package-level warnings
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Package-level errors (non-empty implies `status == Failed`)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// The outcome of installing one package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    /// Files were written and the index was updated
    Installed,
    /// The strategy failed; the workspace index was not touched for it
    Failed,
    /// Nothing to do (already installed, marketplace terminal, ...)
    Skipped,
}

impl PackageReport {
    /// A fresh report for a package that hasn't been processed yet
    pub fn new(name: impl Into<String>) -> Self {
        PackageReport {
            name: name.into(),
            version: None,
            status: ReportStatus::Skipped,
            files_processed: 0,
            files_written: 0,
            file_mapping: SortedMap::new(),
            conflicts: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }
}

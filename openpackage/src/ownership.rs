//! File ownership resolution
//!
//! Before any write, the full set of targets a package's flows would
//! produce is checked against the workspace index: a package may overwrite
//! its own files (that's an update), may claim unowned files with a
//! warning, and is denied files another package owns unless forced. Only
//! plain targets confer ownership; a merge-recorded target is a shared
//! file and never denies.
//!
//! The context is built **per package**, from the committed index plus the
//! mutations already queued this run. It is never shared between packages:
//! a shared context keyed to some synthetic owner would misclassify a
//! reinstall's own files as alien.

use std::collections::{HashMap, HashSet};

use openpackage_schema::{IndexFile, IndexPackage, IndexTarget, SortedMap};
use tracing::debug;

/// Why a write was allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// The package already owns the target; this is an update
    OwnUpdate,
    /// The file exists on disk but nobody owns it; claimed with a warning
    UnownedClaim,
    /// Nothing there yet
    NewFile,
    /// Another package owns it, but `force` was set
    Forced,
}

/// The verdict for one pending target
#[derive(Debug, Clone, PartialEq)]
pub enum OwnershipDecision {
    /// Write may proceed
    Allow(AllowReason),
    /// Write is denied; the file belongs to someone else
    Deny {
        /// the owning package
        owner: String,
    },
}

/// The `(path, owner)` facts one package's install consults
#[derive(Debug, Clone)]
pub struct OwnershipContext {
    package: String,
    own_targets: HashSet<String>,
    other_owners: HashMap<String, String>,
}

impl OwnershipContext {
    /// Build the context for one package from the committed index and the
    /// mutations queued so far this run
    pub fn build(
        package: &str,
        committed: &IndexFile,
        pending: &SortedMap<String, IndexPackage>,
    ) -> Self {
        let mut own_targets = HashSet::new();
        let mut other_owners = HashMap::new();

        let mut absorb = |name: &str, record: &IndexPackage| {
            for targets in record.files.values() {
                for target in targets {
                    let path = target.target_path().to_owned();
                    if name == package {
                        own_targets.insert(path);
                    } else if matches!(target, IndexTarget::Merged { .. }) {
                        // a merge-recorded target is a shared file with many
                        // contributors, not an exclusive claim: it must not
                        // deny other packages' merges into the same file
                    } else {
                        other_owners.entry(path).or_insert_with(|| name.to_owned());
                    }
                }
            }
        };
        for (name, record) in &committed.packages {
            absorb(name, record);
        }
        for (name, record) in pending {
            absorb(name, record);
        }

        OwnershipContext {
            package: package.to_owned(),
            own_targets,
            other_owners,
        }
    }

    /// Decide whether one target may be written
    pub fn decide(&self, target: &str, exists_on_disk: bool, force: bool) -> OwnershipDecision {
        if self.own_targets.contains(target) {
            return OwnershipDecision::Allow(AllowReason::OwnUpdate);
        }
        if let Some(owner) = self.other_owners.get(target) {
            if force {
                debug!("{}: forcing overwrite of {target} (owned by {owner})", self.package);
                return OwnershipDecision::Allow(AllowReason::Forced);
            }
            return OwnershipDecision::Deny {
                owner: owner.clone(),
            };
        }
        if exists_on_disk {
            return OwnershipDecision::Allow(AllowReason::UnownedClaim);
        }
        OwnershipDecision::Allow(AllowReason::NewFile)
    }

    /// The package this context belongs to
    pub fn package(&self) -> &str {
        &self.package
    }
}

//! Errors!
//!
//! One diagnostic enum for the whole install core. The split between
//! "fatal to the phase" and "degrade and continue" shows up here as which
//! conditions are `Err` variants at all: missing packages, cycles, per-file
//! conversion failures, and denied conflicts are *records* on the
//! graph/report, not errors, so you won't find them below.

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// An alias for the common Result type for this crate
pub type OpResult<T> = std::result::Result<T, OpError>;

/// Classification of a remote registry failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFailureKind {
    /// The package doesn't exist remotely
    NotFound,
    /// The registry refused us
    AccessDenied,
    /// The transport failed
    Network,
    /// The response didn't hold together
    Integrity,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for RemoteFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RemoteFailureKind::NotFound => "not-found",
            RemoteFailureKind::AccessDenied => "access-denied",
            RemoteFailureKind::Network => "network",
            RemoteFailureKind::Integrity => "integrity",
            RemoteFailureKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Errors the install core can have
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum OpError {
    /// random i/o error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// random layout-probing error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Project(#[from] openpackage_project::ProjectError),

    /// manifest validation/migration error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] openpackage_schema::ManifestError),

    /// A manifest we couldn't parse
    #[error("couldn't parse manifest at {path}")]
    ManifestParse {
        /// path to the manifest
        path: Utf8PathBuf,
        /// underlying error
        #[source]
        details: serde_yml::Error,
    },

    /// A workspace index we couldn't parse
    #[error("couldn't parse the workspace index at {path}")]
    #[diagnostic(help(
        "the index is machine-maintained; if you edited it by hand, revert or delete it"
    ))]
    IndexParse {
        /// path to the index file
        path: Utf8PathBuf,
        /// underlying error
        #[source]
        details: serde_yml::Error,
    },

    /// A dependency declaration that doesn't hold together
    #[error("invalid dependency {name}: {reason}")]
    InvalidDependency {
        /// the dependency's display name
        name: String,
        /// what was wrong with it
        reason: String,
    },

    /// A git URL we couldn't make sense of
    #[error("couldn't parse git url: {url}")]
    BadGitUrl {
        /// the offending url
        url: String,
        /// underlying error
        #[source]
        details: url::ParseError,
    },

    /// A user-typed package spec we couldn't classify
    #[error("couldn't understand package spec: {input}")]
    #[diagnostic(help(
        "expected a registry name[@version], a git url, a gh@owner/repo shorthand, or an existing path"
    ))]
    UnrecognizedSpec {
        /// what the user typed
        input: String,
    },

    /// A version constraint we couldn't parse
    #[error("couldn't parse version constraint '{range}' for {package}")]
    BadConstraint {
        /// the package the constraint applies to
        package: String,
        /// the constraint string
        range: String,
        /// underlying error
        #[source]
        details: semver::Error,
    },

    /// Constraints have candidates but none satisfies all of them
    #[error("version conflict for {package}: no version satisfies {}", ranges.join(", "))]
    #[diagnostic(help("requested by: {requested_by:?}"))]
    VersionConflict {
        /// the package in conflict
        package: String,
        /// every constraint range in play
        ranges: Vec<String>,
        /// which dependents asked for it
        requested_by: Vec<String>,
    },

    /// A mutable (workspace/global) install pins a version some constraint
    /// excludes
    #[error("{package} is pinned at {pinned} but a dependency requires {range}")]
    #[diagnostic(help("update the pinned install or relax the constraint"))]
    PinnedVersionConflict {
        /// the pinned package
        package: String,
        /// the pinned version
        pinned: semver::Version,
        /// the constraint that excludes it
        range: String,
    },

    /// The remote registry failed in a mode where that's fatal
    #[error("registry lookup of {package} failed ({kind})")]
    RemoteFailure {
        /// the package we were looking up
        package: String,
        /// failure classification
        kind: RemoteFailureKind,
        /// transport-provided detail
        details: String,
    },

    /// A root dependency couldn't be fetched at all
    ///
    /// (Transitive fetch failures degrade to missing-package warnings; a
    /// root that can't be fetched means the requested install is
    /// impossible.)
    #[error("couldn't fetch {package}: {details}")]
    RootFetchFailed {
        /// the root dependency
        package: String,
        /// what the fetcher said
        details: String,
    },

    /// An install strategy failed for a package
    #[error("install of {package} failed: {details}")]
    InstallFailed {
        /// the package being installed
        package: String,
        /// what went wrong
        details: String,
    },

    /// A content root vanished between resolve and install
    #[error("{package} has no content root to install from")]
    #[diagnostic(help("this is a bug in openpackage, please file an issue"))]
    MissingContentRoot {
        /// the package being installed
        package: String,
    },
}

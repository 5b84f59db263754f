//! The fetch seams
//!
//! The actual transports (registry HTTP client, git clone/checkout) live
//! outside the install core; these traits are the contract it consumes.
//! The wave resolver dispatches on declaration shape alone and funnels all
//! three source kinds into one outcome shape internally.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use semver::Version;

use crate::errors::{OpResult, RemoteFailureKind};

/// A remote registry failure, classified
#[derive(Debug, Clone)]
pub struct RemoteError {
    /// what flavor of failure this was
    pub kind: RemoteFailureKind,
    /// transport-provided detail
    pub details: String,
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.details, self.kind)
    }
}

/// The registry transport contract
///
/// "Local" versions are whatever the transport already has materialized on
/// disk (a cache, a store directory); "remote" versions require the network.
/// The solver is what decides when the remote may be consulted.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Versions of a package available without touching the network
    async fn local_versions(&self, name: &str) -> OpResult<Vec<Version>>;

    /// Versions of a package the remote registry offers
    async fn remote_versions(&self, name: &str) -> Result<Vec<Version>, RemoteError>;

    /// The on-disk content root for one version of a package
    ///
    /// `None` means the transport couldn't materialize it (the version
    /// exists in the listing but the payload is gone).
    async fn content_root(&self, name: &str, version: &Version) -> OpResult<Option<Utf8PathBuf>>;

    /// A mutable (workspace/global) install of this package, if one exists
    ///
    /// Mutable installs pin the solver: a constraint that excludes the pin
    /// is fatal rather than silently resolving past what's on disk.
    async fn pinned_version(&self, name: &str) -> OpResult<Option<Version>>;
}

/// The git transport contract
#[async_trait]
pub trait GitLoader: Send + Sync {
    /// Materialize a checkout of `url` at `reference`, pointing at
    /// `subpath` within it
    ///
    /// Errors are strings: every failure of the transport is equally opaque
    /// to the core, which only ever degrades them to warnings or wraps them
    /// for the root.
    async fn load(
        &self,
        url: &str,
        reference: Option<&str>,
        subpath: Option<&str>,
    ) -> Result<GitCheckout, String>;
}

/// What a git load produced
#[derive(Debug, Clone)]
pub struct GitCheckout {
    /// The directory holding the package's files; `None` for marketplace
    /// containers (they are terminal, never installed)
    pub content_root: Option<Utf8PathBuf>,
    /// The root of the checked-out repository
    pub repo_path: Utf8PathBuf,
    /// The commit the checkout landed on
    pub commit_sha: Option<String>,
    /// Whether the target carries a marketplace manifest
    pub is_marketplace: bool,
}

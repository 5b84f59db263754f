//! Top-level install orchestration
//!
//! Wires the pipeline together: read the workspace manifest, resolve the
//! wave graph, lift it into install contexts, run the wave installer, hand
//! back the receipt. The CLI layer above supplies the transports and the
//! output port; everything else is decided here.

use camino::Utf8Path;
use openpackage_schema::{InstallReceipt, PackageManifest};
use tracing::info;

use crate::cache::ContentRootCache;
use crate::errors::OpResult;
use crate::fetch::{GitLoader, RegistryClient};
use crate::installer::{InstallOptions, OutputPort, WaveInstaller};
use crate::manifest::read_manifest;
use crate::resolver::graph::WaveResult;
use crate::resolver::{ResolveOptions, WaveResolver};

/// The transports an install run needs
pub struct InstallServices<'a> {
    /// registry transport
    pub registry: &'a dyn RegistryClient,
    /// git transport
    pub git: &'a dyn GitLoader,
}

/// Resolve a workspace's dependency graph without installing anything
pub async fn resolve_workspace(
    workspace: &Utf8Path,
    services: &InstallServices<'_>,
    options: ResolveOptions,
) -> OpResult<WaveResult> {
    let manifest = read_manifest(workspace)?.unwrap_or_else(|| {
        info!("no manifest at {workspace}; resolving an empty workspace");
        PackageManifest::default()
    });
    let cache = ContentRootCache::new();
    let resolver = WaveResolver::new(services.registry, services.git, &cache, options);
    resolver.resolve(&manifest, workspace).await
}

/// Resolve and install a workspace's dependencies
pub async fn install_workspace(
    workspace: &Utf8Path,
    services: &InstallServices<'_>,
    resolve_options: ResolveOptions,
    install_options: InstallOptions,
    output: &dyn OutputPort,
) -> OpResult<InstallReceipt> {
    let result = resolve_workspace(workspace, services, resolve_options).await?;
    let installer = WaveInstaller::new(workspace, install_options, output);
    installer.install(&result).await
}

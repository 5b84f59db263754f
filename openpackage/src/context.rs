//! Install contexts
//!
//! A context is one package's worth of install work, lifted out of a
//! [`WaveNode`][crate::resolver::graph::WaveNode] before the install stage
//! begins. The wave installer groups contexts by wave and hands each one to
//! a strategy.

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;

use crate::installer::InstallOptions;
use crate::resolver::graph::WaveResult;
use crate::source::PackageSource;

/// One package's install work
#[derive(Debug, Clone)]
pub struct InstallContext {
    /// The graph node's canonical id
    pub node_id: String,
    /// Display name (doubles as the index key)
    pub package_name: String,
    /// The BFS wave the node sits in
    pub wave: usize,
    /// The workspace root files land under
    pub target_dir: Utf8PathBuf,
    /// Where the package came from
    pub source: PackageSource,
    /// Where its files are (absent for marketplace/missing nodes)
    pub content_root: Option<Utf8PathBuf>,
    /// The solver's pick, for registry packages
    pub resolved_version: Option<Version>,
    /// Display names of the packages this one depends on
    pub dependencies: Vec<String>,
    /// Marketplace containers are reported skipped, never installed
    pub is_marketplace: bool,
    /// The workspace root node is never installed onto itself
    pub is_root: bool,
    /// Whether resolution failed to locate the package
    pub missing: bool,
}

/// Lift every node of a resolved graph into an install context, in install
/// order
pub fn build_contexts(
    result: &WaveResult,
    workspace: &Utf8Path,
    _options: &InstallOptions,
) -> Vec<InstallContext> {
    let graph = &result.graph;
    graph
        .install_order
        .iter()
        .filter_map(|id| graph.node(id))
        .map(|node| InstallContext {
            node_id: node.id.clone(),
            package_name: node.display_name.clone(),
            wave: node.wave,
            target_dir: workspace.to_owned(),
            source: node.source.clone(),
            content_root: node.content_root.clone(),
            resolved_version: node.resolved_version.clone(),
            dependencies: node
                .children
                .iter()
                .filter_map(|child| graph.node(child))
                .map(|child| child.display_name.clone())
                .collect(),
            is_marketplace: node.is_marketplace,
            is_root: node.is_root,
            missing: node.missing,
        })
        .collect()
}

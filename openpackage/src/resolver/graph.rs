//! The wave graph
//!
//! The resolver's output: one node per canonical source id, linked parent ↔
//! child, stamped with the BFS wave it belongs to. All work is precomputed
//! here before the install stage begins; the installer never discovers new
//! packages mid-flight.

use camino::Utf8PathBuf;
use itertools::Itertools;
use openpackage_schema::{PackageDependency, PackageManifest, SortedMap};
use semver::Version;

use crate::solver::VersionConflictInfo;
use crate::source::PackageSource;

/// One resolved dependency
#[derive(Debug, Clone)]
pub struct WaveNode {
    /// Canonical id (`registry:<name>`, `git:<url>#<ref>:<subpath>`,
    /// `path:<abs>`)
    pub id: String,
    /// Human-facing name
    pub display_name: String,
    /// The fully resolved source
    pub source: PackageSource,
    /// Every declaration edge that led here
    pub declarations: Vec<PackageDependency>,
    /// The version the solver picked, for registry nodes
    pub resolved_version: Option<Version>,
    /// Where the package's files are
    pub content_root: Option<Utf8PathBuf>,
    /// The enclosing repo root, for git nodes
    pub repo_root: Option<Utf8PathBuf>,
    /// The package's own manifest, when it has one
    pub manifest: Option<PackageManifest>,
    /// Ids of the nodes this one depends on
    pub children: Vec<String>,
    /// Ids of the nodes that depend on this one
    pub parents: Vec<String>,
    /// BFS wave: 0 for roots, `1 + max(parent waves)` otherwise
    pub wave: usize,
    /// Whether this is a marketplace container (terminal, never installed)
    pub is_marketplace: bool,
    /// Whether this is the workspace root itself
    pub is_root: bool,
    /// Whether the package could not be located
    pub missing: bool,
}

impl WaveNode {
    /// A fresh node with nothing fetched yet
    pub fn new(id: String, display_name: String, source: PackageSource) -> Self {
        WaveNode {
            id,
            display_name,
            source,
            declarations: Vec::new(),
            resolved_version: None,
            content_root: None,
            repo_root: None,
            manifest: None,
            children: Vec::new(),
            parents: Vec::new(),
            wave: 0,
            is_marketplace: false,
            is_root: false,
            missing: false,
        }
    }
}

/// The whole resolved graph
#[derive(Debug, Clone, Default)]
pub struct WaveGraph {
    /// Every node, keyed by id
    pub nodes: SortedMap<String, WaveNode>,
    /// Ids of the wave-0 nodes
    pub roots: Vec<String>,
    /// Ids leaves-first: every non-cycle child precedes its parents; stable
    /// within a wave by id
    pub install_order: Vec<String>,
    /// Detected cycles, each as a display-name chain ending where it began
    pub cycles: Vec<Vec<String>>,
    /// How many waves the BFS ran
    pub wave_count: usize,
    /// Resolution warnings (missing packages, cycles, cap hits, ...)
    pub warnings: Vec<String>,
}

impl WaveGraph {
    /// Look up a node
    pub fn node(&self, id: &str) -> Option<&WaveNode> {
        self.nodes.get(id)
    }

    /// Recompute every node's wave from the parent edges, then the install
    /// order from the waves
    ///
    /// Waves relax to a fixed point; the graph is a DAG (cycle edges are
    /// recorded in [`WaveGraph::cycles`][] and never linked), so this
    /// terminates.
    pub fn finalize(&mut self) {
        // wave relaxation
        loop {
            let mut changed = false;
            let ids: Vec<String> = self.nodes.keys().cloned().collect();
            for id in &ids {
                let parents = self.nodes[id].parents.clone();
                let wave = if parents.is_empty() {
                    0
                } else {
                    1 + parents
                        .iter()
                        .filter_map(|p| self.nodes.get(p).map(|n| n.wave))
                        .max()
                        .unwrap_or(0)
                };
                let node = self.nodes.get_mut(id).unwrap();
                if node.wave != wave {
                    node.wave = wave;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        self.wave_count = self
            .nodes
            .values()
            .map(|node| node.wave + 1)
            .max()
            .unwrap_or(0);

        // leaves first; within a wave, by id
        self.install_order = self
            .nodes
            .values()
            .map(|node| (node.wave, node.id.clone()))
            .sorted_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, id)| id)
            .collect();
    }

    /// Whether a directed path `from ⇝ to` exists along child edges
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let mut stack = vec![from];
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id.to_owned()) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for child in &node.children {
                if child == to {
                    return true;
                }
                stack.push(child);
            }
        }
        false
    }

    /// A display-name path `from ⇝ to` along child edges, if one exists
    pub fn path_names(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let mut stack = vec![vec![from.to_owned()]];
        let mut seen = std::collections::HashSet::new();
        while let Some(path) = stack.pop() {
            let last = path.last().unwrap().clone();
            if last == to {
                return Some(
                    path.iter()
                        .map(|id| {
                            self.nodes
                                .get(id)
                                .map(|n| n.display_name.clone())
                                .unwrap_or_else(|| id.clone())
                        })
                        .collect(),
                );
            }
            if !seen.insert(last.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&last) {
                for child in &node.children {
                    let mut next = path.clone();
                    next.push(child.clone());
                    stack.push(next);
                }
            }
        }
        None
    }
}

/// The solver's aggregate output across the graph
#[derive(Debug, Clone, Default)]
pub struct VersionSolution {
    /// package name → selected version
    pub resolved: SortedMap<String, Version>,
    /// recorded conflicts (at most one: the first conflict is fatal)
    pub conflicts: Vec<VersionConflictInfo>,
    /// package names that couldn't be located
    pub missing: Vec<String>,
}

/// What a resolve run hands to the install stage
#[derive(Debug, Clone)]
pub struct WaveResult {
    /// the graph
    pub graph: WaveGraph,
    /// the version solution
    pub version_solution: VersionSolution,
}

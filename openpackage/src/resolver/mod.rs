//! The wave resolver
//!
//! Walks the dependency frontier wave by wave: drain, group by canonical id,
//! fetch each group once (in parallel), link edges, enqueue unseen children.
//! Registry nodes are re-solved whenever a later wave contributes new
//! constraint ranges; an unsatisfiable combination is fatal, everything else
//! degrades to warnings on the graph.

pub mod graph;

use camino::{Utf8Path, Utf8PathBuf};
use futures::future::join_all;
use openpackage_schema::{PackageDependency, PackageManifest, SortedMap};
use semver::Version;
use tracing::{debug, info, warn};

use crate::cache::{ContentRootCache, GitKey};
use crate::errors::{OpError, OpResult};
use crate::fetch::{GitLoader, RegistryClient};
use crate::manifest::read_manifest;
use crate::solver::{solve_version, ResolutionMode};
use crate::source::{address_dependency, resolve_path, PackageSource, SourceAddress};

use graph::{VersionSolution, WaveGraph, WaveNode, WaveResult};

/// Safety-valve cap on graph size
pub const DEFAULT_MAX_NODES: usize = 10_000;

/// Knobs for one resolve run
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// How far the solver may reach for versions
    pub mode: ResolutionMode,
    /// Stop growing the graph past this many nodes
    pub max_nodes: usize,
    /// Whether the root manifest's dev-dependencies participate
    ///
    /// Dev-dependencies are never resolved transitively; this only controls
    /// the root's own.
    pub include_dev: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            mode: ResolutionMode::default(),
            max_nodes: DEFAULT_MAX_NODES,
            include_dev: true,
        }
    }
}

/// One pending edge on the BFS frontier
#[derive(Debug, Clone)]
struct FrontierItem {
    decl: PackageDependency,
    decl_dir: Utf8PathBuf,
    parent: String,
    depth: usize,
}

/// What one fetch produced, before it's applied to the graph
struct FetchOutcome {
    id: String,
    resolved_version: Option<Version>,
    content_root: Option<Utf8PathBuf>,
    repo_root: Option<Utf8PathBuf>,
    manifest: Option<PackageManifest>,
    is_marketplace: bool,
    missing: bool,
    warnings: Vec<String>,
}

/// The wave-based BFS dependency resolver
pub struct WaveResolver<'a> {
    registry: &'a dyn RegistryClient,
    git: &'a dyn GitLoader,
    cache: &'a ContentRootCache,
    options: ResolveOptions,
}

impl<'a> WaveResolver<'a> {
    /// Build a resolver over the given transports
    pub fn new(
        registry: &'a dyn RegistryClient,
        git: &'a dyn GitLoader,
        cache: &'a ContentRootCache,
        options: ResolveOptions,
    ) -> Self {
        WaveResolver {
            registry,
            git,
            cache,
            options,
        }
    }

    /// Resolve the full graph under a root manifest
    pub async fn resolve(
        &self,
        root_manifest: &PackageManifest,
        root_dir: &Utf8Path,
    ) -> OpResult<WaveResult> {
        let mut graph = WaveGraph::default();
        let root_dir = resolve_path(Utf8Path::new(""), root_dir);
        let root_id = format!("path:{root_dir}");
        let root_name = root_manifest
            .name
            .clone()
            .unwrap_or_else(|| root_dir.file_name().unwrap_or("workspace").to_owned());
        let mut root_node = WaveNode::new(
            root_id.clone(),
            root_name,
            PackageSource::Path {
                path: root_dir.clone(),
            },
        );
        root_node.is_root = true;
        root_node.manifest = Some(root_manifest.clone());
        root_node.content_root = Some(root_dir.clone());
        graph.nodes.insert(root_id.clone(), root_node);
        graph.roots.push(root_id.clone());

        // a root `overrides` entry replaces every constraint descendants
        // declare for that package; plain root dependencies are ordinary
        // edges and combine like any other
        let root_overrides: SortedMap<String, String> = root_manifest.overrides.clone();

        let mut frontier: Vec<FrontierItem> = Vec::new();
        let root_decls: Vec<&PackageDependency> = if self.options.include_dev {
            root_manifest
                .dependencies
                .iter()
                .chain(&root_manifest.dev_dependencies)
                .collect()
        } else {
            root_manifest.dependencies.iter().collect()
        };
        for decl in root_decls {
            frontier.push(FrontierItem {
                decl: decl.clone(),
                decl_dir: root_dir.clone(),
                parent: root_id.clone(),
                depth: 1,
            });
        }

        let mut wave = 0usize;
        let mut cap_hit = false;
        while !frontier.is_empty() {
            wave += 1;
            debug!("resolve wave {wave}: {} pending edges", frontier.len());
            let items = std::mem::take(&mut frontier);

            // group the frontier by canonical id
            let mut groups: SortedMap<String, (SourceAddress, Vec<FrontierItem>)> =
                SortedMap::new();
            for item in items {
                let address = match address_dependency(&item.decl, &item.decl_dir) {
                    Ok(address) => address,
                    Err(details) => {
                        warn!("skipping invalid dependency: {details}");
                        graph
                            .warnings
                            .push(format!("skipping invalid dependency: {details}"));
                        continue;
                    }
                };
                groups
                    .entry(address.id.clone())
                    .or_insert_with(|| (address, Vec::new()))
                    .1
                    .push(item);
            }

            // link edges, create nodes, decide what needs fetching
            let mut to_fetch: Vec<String> = Vec::new();
            for (id, (address, items)) in &groups {
                let is_new = !graph.nodes.contains_key(id);
                if is_new {
                    if graph.nodes.len() >= self.options.max_nodes {
                        if !cap_hit {
                            cap_hit = true;
                            let message = format!(
                                "dependency graph hit the {} node safety cap; not resolving further",
                                self.options.max_nodes
                            );
                            warn!("{message}");
                            graph.warnings.push(message);
                        }
                        continue;
                    }
                    graph.nodes.insert(
                        id.clone(),
                        WaveNode::new(
                            id.clone(),
                            address.display_name.clone(),
                            address.source.clone(),
                        ),
                    );
                }

                let mut gained_ranges = false;
                for item in items {
                    // a child edge back to an ancestor is a cycle: record it
                    // and don't link
                    if graph.reaches(id, &item.parent) {
                        let mut chain = graph
                            .path_names(id, &item.parent)
                            .unwrap_or_else(|| vec![id.clone(), item.parent.clone()]);
                        chain.push(chain[0].clone());
                        let message = format!("dependency cycle: {}", chain.join(" -> "));
                        warn!("{message}");
                        graph.warnings.push(message);
                        graph.cycles.push(chain);
                        continue;
                    }
                    if let Some(parent) = graph.nodes.get_mut(&item.parent) {
                        if !parent.children.contains(id) {
                            parent.children.push(id.clone());
                        }
                    }
                    let node = graph.nodes.get_mut(id).unwrap();
                    if !node.parents.contains(&item.parent) {
                        node.parents.push(item.parent.clone());
                    }
                    let had = node
                        .declarations
                        .iter()
                        .any(|existing| existing == &item.decl);
                    if !had {
                        gained_ranges |= item.decl.version.is_some();
                        node.declarations.push(item.decl.clone());
                    }
                }

                let needs_fetch = is_new
                    || (gained_ranges
                        && matches!(address.source, PackageSource::Registry { .. }));
                if needs_fetch {
                    to_fetch.push(id.clone());
                }
            }

            // fetch every (re)touched node in parallel
            let fetches = to_fetch.iter().map(|id| {
                let node = &graph.nodes[id];
                self.fetch_node(node, &root_overrides, &graph)
            });
            let mut outcomes: Vec<FetchOutcome> = Vec::new();
            for outcome in join_all(fetches).await {
                outcomes.push(outcome?);
            }
            outcomes.sort_by(|a, b| a.id.cmp(&b.id));

            // apply outcomes and enqueue children
            for outcome in outcomes {
                let node = graph.nodes.get_mut(&outcome.id).unwrap();
                let version_changed = node.resolved_version.is_some()
                    && node.resolved_version != outcome.resolved_version;
                let first_fetch =
                    node.content_root.is_none() && outcome.content_root.is_some();
                node.resolved_version = outcome.resolved_version.clone();
                node.content_root = outcome.content_root.clone();
                node.repo_root = outcome.repo_root.clone();
                node.manifest = outcome.manifest.clone();
                node.is_marketplace = outcome.is_marketplace;
                node.missing = outcome.missing;
                graph.warnings.extend(outcome.warnings);

                if outcome.missing {
                    continue;
                }
                if outcome.is_marketplace {
                    // marketplace containers are terminal: no children
                    continue;
                }
                if version_changed {
                    // a later constraint moved the version; drop the stale
                    // child edges, the refetched manifest re-adds real ones
                    let stale: Vec<String> = {
                        let node = graph.nodes.get_mut(&outcome.id).unwrap();
                        std::mem::take(&mut node.children)
                    };
                    for child in stale {
                        if let Some(child_node) = graph.nodes.get_mut(&child) {
                            child_node.parents.retain(|p| p != &outcome.id);
                        }
                    }
                }
                if !(first_fetch || version_changed) {
                    continue;
                }
                let Some(manifest) = &graph.nodes[&outcome.id].manifest else {
                    continue;
                };
                let Some(content_root) = graph.nodes[&outcome.id].content_root.clone() else {
                    continue;
                };
                // dev-dependencies are root-only; transitive manifests
                // contribute plain dependencies alone
                let depth = groups
                    .get(&outcome.id)
                    .map(|(_, items)| items.iter().map(|i| i.depth).min().unwrap_or(1))
                    .unwrap_or(1);
                for decl in manifest.dependencies.clone() {
                    frontier.push(FrontierItem {
                        decl,
                        decl_dir: content_root.clone(),
                        parent: outcome.id.clone(),
                        depth: depth + 1,
                    });
                }
            }
        }

        // drop nodes a version bump orphaned
        self.prune_orphans(&mut graph);

        // a missing package is fatal only when the root asked for it
        for node in graph.nodes.values() {
            if node.missing && node.parents.contains(&root_id) {
                return Err(OpError::RootFetchFailed {
                    package: node.display_name.clone(),
                    details: "package could not be located".to_owned(),
                });
            }
        }

        graph.finalize();
        let mut solution = VersionSolution::default();
        for node in graph.nodes.values() {
            if node.missing {
                solution.missing.push(node.display_name.clone());
                graph
                    .warnings
                    .push(format!("missing package: {}", node.display_name));
                continue;
            }
            if let (PackageSource::Registry { name }, Some(version)) =
                (&node.source, &node.resolved_version)
            {
                solution.resolved.insert(name.clone(), version.clone());
            }
        }
        // keep warning order deterministic regardless of fetch completion
        solution.missing.sort();
        info!(
            "resolved {} packages across {} waves",
            graph.nodes.len(),
            graph.wave_count.max(wave)
        );
        Ok(WaveResult {
            graph,
            version_solution: solution,
        })
    }

    /// Fetch one node according to its source kind
    async fn fetch_node(
        &self,
        node: &WaveNode,
        root_overrides: &SortedMap<String, String>,
        graph: &WaveGraph,
    ) -> OpResult<FetchOutcome> {
        let mut outcome = FetchOutcome {
            id: node.id.clone(),
            resolved_version: None,
            content_root: None,
            repo_root: None,
            manifest: None,
            is_marketplace: false,
            missing: false,
            warnings: Vec::new(),
        };
        match &node.source {
            PackageSource::Registry { name } => {
                let ranges: Vec<String> = match root_overrides.get(name) {
                    Some(range) => vec![range.clone()],
                    None => node
                        .declarations
                        .iter()
                        .filter_map(|decl| decl.version.clone())
                        .collect(),
                };
                let requested_by: Vec<String> = node
                    .parents
                    .iter()
                    .map(|parent| {
                        graph
                            .node(parent)
                            .map(|n| n.display_name.clone())
                            .unwrap_or_else(|| parent.clone())
                    })
                    .collect();
                let solved = solve_version(
                    name,
                    &ranges,
                    &requested_by,
                    self.registry,
                    self.options.mode,
                )
                .await?;
                outcome.warnings.extend(solved.warnings);
                let Some(version) = solved.version else {
                    outcome.missing = true;
                    return Ok(outcome);
                };
                match self.registry.content_root(name, &version).await? {
                    Some(content_root) => {
                        outcome.manifest = read_manifest(&content_root)?;
                        outcome.content_root = Some(content_root);
                        outcome.resolved_version = Some(version);
                    }
                    None => {
                        outcome
                            .warnings
                            .push(format!("{name}@{version} has no content on disk"));
                        outcome.missing = true;
                    }
                }
            }
            PackageSource::Git {
                url,
                reference,
                subpath,
            } => {
                let key = GitKey {
                    url: url.clone(),
                    reference: reference.clone(),
                    subpath: subpath.clone(),
                };
                match self.cache.resolve(key, self.git).await {
                    Ok(checkout) => {
                        outcome.is_marketplace = checkout.is_marketplace;
                        outcome.repo_root = Some(checkout.repo_path);
                        if let Some(content_root) = checkout.content_root {
                            outcome.manifest = read_manifest(&content_root)?;
                            outcome.content_root = Some(content_root);
                        }
                    }
                    Err(details) => {
                        outcome
                            .warnings
                            .push(format!("couldn't fetch {url}: {details}"));
                        outcome.missing = true;
                    }
                }
            }
            PackageSource::Path { path } => {
                if path.as_std_path().is_dir() {
                    outcome.manifest = read_manifest(path)?;
                    outcome.content_root = Some(path.clone());
                } else {
                    outcome
                        .warnings
                        .push(format!("local dependency path doesn't exist: {path}"));
                    outcome.missing = true;
                }
            }
        }
        Ok(outcome)
    }

    /// Drop nodes no longer reachable from the roots
    fn prune_orphans(&self, graph: &mut WaveGraph) {
        let mut reachable = std::collections::HashSet::new();
        let mut stack: Vec<String> = graph.roots.clone();
        while let Some(id) = stack.pop() {
            if !reachable.insert(id.clone()) {
                continue;
            }
            if let Some(node) = graph.nodes.get(&id) {
                stack.extend(node.children.iter().cloned());
            }
        }
        if reachable.len() == graph.nodes.len() {
            return;
        }
        graph.nodes.retain(|id, _| reachable.contains(id));
        for node in graph.nodes.values_mut() {
            node.children.retain(|child| reachable.contains(child));
            node.parents.retain(|parent| reachable.contains(parent));
        }
    }
}

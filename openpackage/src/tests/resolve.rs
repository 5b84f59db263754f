//! Tests for the wave resolver

use semver::Version;

use crate::errors::OpError;
use crate::resolve_workspace;
use crate::resolver::ResolveOptions;

use super::mock::{git_dep, manifest_with_deps, registry_dep, MockWorld};

fn resolve(world: &MockWorld) -> crate::resolver::graph::WaveResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime
        .block_on(resolve_workspace(
            &world.workspace_root(),
            &world.services(),
            ResolveOptions::default(),
        ))
        .unwrap()
}

fn try_resolve(world: &MockWorld) -> crate::errors::OpResult<crate::resolver::graph::WaveResult> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(resolve_workspace(
        &world.workspace_root(),
        &world.services(),
        ResolveOptions::default(),
    ))
}

#[test]
fn diamond_dependency_resolves_one_node() {
    // root depends on a@1.2 and b; b depends on a@^1.0
    let mut world = MockWorld::new();
    world.add_package("a", "1.0.0", &[], &[]);
    world.add_package("a", "1.2.0", &[], &[]);
    world.add_package("b", "1.0.0", &[("a", "^1.0")], &[]);
    world.set_root_manifest(&manifest_with_deps(
        "root",
        None,
        &[("a", "1.2"), ("b", "")],
    ));

    let result = resolve(&world);
    let graph = &result.graph;

    // exactly one node for a, merged across both edges
    assert!(graph.node("registry:a").is_some());
    let a = graph.node("registry:a").unwrap();
    assert_eq!(a.resolved_version, Some(Version::new(1, 2, 0)));
    assert_eq!(a.declarations.len(), 2);
    assert_eq!(a.parents.len(), 2);

    // leaves first: a, then b, then the workspace root
    let names: Vec<&str> = graph
        .install_order
        .iter()
        .map(|id| graph.node(id).unwrap().display_name.as_str())
        .collect();
    assert_eq!(names, vec!["a", "b", "root"]);
    assert_eq!(result.version_solution.resolved["a"], Version::new(1, 2, 0));
    assert!(result.version_solution.conflicts.is_empty());
    assert!(graph.cycles.is_empty());
}

#[test]
fn unsatisfiable_constraints_are_fatal() {
    // root pins a@1.0.0 while b wants ^2.0.0; both versions exist
    let mut world = MockWorld::new();
    world.add_package("a", "1.0.0", &[], &[]);
    world.add_package("a", "2.0.0", &[], &[]);
    world.add_package("b", "1.0.0", &[("a", "^2.0.0")], &[]);
    world.set_root_manifest(&manifest_with_deps(
        "root",
        None,
        &[("a", "1.0.0"), ("b", "")],
    ));

    let error = try_resolve(&world).unwrap_err();
    match error {
        OpError::VersionConflict {
            package, ranges, ..
        } => {
            assert_eq!(package, "a");
            assert!(ranges.contains(&"1.0.0".to_owned()));
            assert!(ranges.contains(&"^2.0.0".to_owned()));
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }
}

#[test]
fn root_override_replaces_descendant_constraints() {
    // same shape as the conflict test, but an override settles it
    let mut world = MockWorld::new();
    world.add_package("a", "1.0.0", &[], &[]);
    world.add_package("a", "2.0.0", &[], &[]);
    world.add_package("b", "1.0.0", &[("a", "^2.0.0")], &[]);
    let mut manifest = manifest_with_deps("root", None, &[("a", "1.0.0"), ("b", "")]);
    manifest
        .overrides
        .insert("a".to_owned(), "1.0.0".to_owned());
    world.set_root_manifest(&manifest);

    let result = resolve(&world);
    assert_eq!(
        result.version_solution.resolved["a"],
        Version::new(1, 0, 0)
    );
}

#[test]
fn marketplace_node_is_terminal() {
    let mut world = MockWorld::new();
    world.add_git_repo(
        "https://github.com/acme/mega-market",
        &[("a", "")],
        &[(".claude-plugin/plugin.json", "{}")],
        true,
    );
    // `a` exists but must never be reached through the marketplace
    world.add_package("a", "1.0.0", &[], &[]);
    let mut manifest = manifest_with_deps("root", None, &[]);
    manifest
        .dependencies
        .push(git_dep("https://github.com/acme/mega-market"));
    world.set_root_manifest(&manifest);

    let result = resolve(&world);
    let graph = &result.graph;
    let market = graph
        .nodes
        .values()
        .find(|node| node.is_marketplace)
        .expect("marketplace node missing");
    assert!(market.children.is_empty());
    assert!(graph.node("registry:a").is_none());
}

#[test]
fn cycle_is_recorded_and_survived() {
    // p -> q -> p
    let mut world = MockWorld::new();
    world.add_package("p", "1.0.0", &[("q", "")], &[]);
    world.add_package("q", "1.0.0", &[("p", "")], &[]);
    world.set_root_manifest(&manifest_with_deps("root", None, &[("p", "")]));

    let result = resolve(&world);
    let graph = &result.graph;
    assert_eq!(graph.cycles, vec![vec!["p".to_owned(), "q".to_owned(), "p".to_owned()]]);
    assert!(graph.warnings.iter().any(|w| w.contains("cycle")));
    // both resolved exactly once, neither missing
    assert!(graph.node("registry:p").is_some());
    assert!(graph.node("registry:q").is_some());
    assert!(result.version_solution.missing.is_empty());
}

#[test]
fn node_cap_stops_growth_with_warning() {
    // a chain long enough to blow a tiny cap
    let mut world = MockWorld::new();
    world.add_package("p0", "1.0.0", &[("p1", "")], &[]);
    world.add_package("p1", "1.0.0", &[("p2", "")], &[]);
    world.add_package("p2", "1.0.0", &[("p3", "")], &[]);
    world.add_package("p3", "1.0.0", &[("p4", "")], &[]);
    world.add_package("p4", "1.0.0", &[], &[]);
    world.set_root_manifest(&manifest_with_deps("root", None, &[("p0", "")]));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let result = runtime
        .block_on(resolve_workspace(
            &world.workspace_root(),
            &world.services(),
            ResolveOptions {
                max_nodes: 3,
                ..Default::default()
            },
        ))
        .unwrap();
    let graph = &result.graph;
    assert_eq!(graph.nodes.len(), 3);
    assert!(graph.warnings.iter().any(|w| w.contains("safety cap")));
    // install order stays a permutation of the retained nodes
    assert_eq!(graph.install_order.len(), graph.nodes.len());
}

#[test]
fn dev_dependencies_stay_at_the_root() {
    let mut world = MockWorld::new();
    // x's own dev-dependency on y must not be resolved
    world.add_package("y", "1.0.0", &[], &[]);
    world.add_package("x", "1.0.0", &[], &[]);
    // hand-edit x's manifest to carry a dev-dependency
    let x_root = {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime
            .block_on(crate::fetch::RegistryClient::content_root(
                &world.registry,
                "x",
                &Version::new(1, 0, 0),
            ))
            .unwrap()
            .unwrap()
    };
    let mut x_manifest = manifest_with_deps("x", Some("1.0.0"), &[]);
    x_manifest.dev_dependencies.push(registry_dep("y", ""));
    crate::manifest::write_manifest(
        &crate::manifest::manifest_path(&x_root),
        &x_manifest,
    )
    .unwrap();

    let mut root = manifest_with_deps("root", None, &[("x", "")]);
    root.dev_dependencies.push(registry_dep("z", ""));
    world.add_package("z", "1.0.0", &[], &[]);
    world.set_root_manifest(&root);

    let result = resolve(&world);
    let graph = &result.graph;
    // the root's dev-dep resolved, x's didn't
    assert!(graph.node("registry:z").is_some());
    assert!(graph.node("registry:y").is_none());
}

#[test]
fn resolve_is_deterministic() {
    let mut world = MockWorld::new();
    world.add_package("a", "1.2.0", &[], &[]);
    world.add_package("b", "1.0.0", &[("a", "^1.0")], &[]);
    world.add_package("c", "1.0.0", &[("a", "^1.0")], &[]);
    world.set_root_manifest(&manifest_with_deps(
        "root",
        None,
        &[("b", ""), ("c", "")],
    ));

    let first = resolve(&world);
    let second = resolve(&world);
    assert_eq!(first.graph.install_order, second.graph.install_order);
    assert_eq!(
        first.version_solution.resolved,
        second.version_solution.resolved
    );
}

#[test]
fn missing_transitive_package_degrades_missing_root_is_fatal() {
    let mut world = MockWorld::new();
    world.add_package("b", "1.0.0", &[("ghost", "")], &[]);
    world.set_root_manifest(&manifest_with_deps("root", None, &[("b", "")]));

    let result = resolve(&world);
    assert_eq!(result.version_solution.missing, vec!["ghost".to_owned()]);
    assert!(result
        .graph
        .warnings
        .iter()
        .any(|w| w.contains("missing package: ghost")));

    // the same ghost as a root dependency is fatal
    let world2 = {
        let mut world2 = MockWorld::new();
        world2.set_root_manifest(&manifest_with_deps("root", None, &[("ghost", "")]));
        world2
    };
    assert!(matches!(
        try_resolve(&world2).unwrap_err(),
        OpError::RootFetchFailed { .. }
    ));
}

#[test]
fn broken_git_repo_degrades_to_missing() {
    let mut world = MockWorld::new();
    world.add_broken_git_repo("https://github.com/acme/flaky", "clone failed");
    world.add_package("left", "1.0.0", &[], &[]);
    world.add_package("right", "1.0.0", &[], &[]);
    let left_root = {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime
            .block_on(crate::fetch::RegistryClient::content_root(
                &world.registry,
                "left",
                &Version::new(1, 0, 0),
            ))
            .unwrap()
            .unwrap()
    };
    let mut left_manifest = manifest_with_deps("left", Some("1.0.0"), &[]);
    left_manifest
        .dependencies
        .push(git_dep("https://github.com/acme/flaky"));
    crate::manifest::write_manifest(
        &crate::manifest::manifest_path(&left_root),
        &left_manifest,
    )
    .unwrap();
    world.set_root_manifest(&manifest_with_deps(
        "root",
        None,
        &[("left", ""), ("right", "")],
    ));

    let result = resolve(&world);
    assert!(result
        .graph
        .warnings
        .iter()
        .any(|w| w.contains("clone failed")));
    assert_eq!(
        world
            .git
            .load_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[test]
fn install_order_and_waves_respect_edges() {
    // root -> a -> b -> c, root -> b: b's wave is past both parents
    let mut world = MockWorld::new();
    world.add_package("c", "1.0.0", &[], &[]);
    world.add_package("b", "1.0.0", &[("c", "")], &[]);
    world.add_package("a", "1.0.0", &[("b", "")], &[]);
    world.set_root_manifest(&manifest_with_deps(
        "root",
        None,
        &[("a", ""), ("b", "")],
    ));

    let result = resolve(&world);
    let graph = &result.graph;
    for node in graph.nodes.values() {
        let parent_max = node
            .parents
            .iter()
            .filter_map(|parent| graph.node(parent))
            .map(|parent| parent.wave)
            .max();
        match parent_max {
            Some(max) => assert_eq!(node.wave, max + 1, "wave invariant broke for {}", node.id),
            None => assert_eq!(node.wave, 0),
        }
    }
    // every child precedes every parent in the install order
    let position = |id: &str| {
        graph
            .install_order
            .iter()
            .position(|other| other == id)
            .unwrap()
    };
    for node in graph.nodes.values() {
        for child in &node.children {
            assert!(
                position(child) < position(&node.id),
                "{child} should precede {}",
                node.id
            );
        }
    }
    assert_eq!(graph.install_order.len(), graph.nodes.len());
}

#[test]
fn local_path_dependencies_resolve() {
    let world = MockWorld::new();
    // a vendored directory with its own manifest
    let vendored = world.workspace_root().join("vendored/side-pack");
    crate::fsutil::write_file(
        &vendored.join("openpackage.yml"),
        "name: side-pack\nversion: 0.1.0\n",
    )
    .unwrap();
    crate::fsutil::write_file(&vendored.join("agents/side.md"), "# Side\n").unwrap();

    let mut manifest = manifest_with_deps("root", None, &[]);
    manifest
        .dependencies
        .push(openpackage_schema::PackageDependency {
            path: Some("vendored/side-pack".to_owned()),
            ..Default::default()
        });
    world.set_root_manifest(&manifest);

    let result = resolve(&world);
    let node = result
        .graph
        .nodes
        .values()
        .find(|node| node.display_name == "side-pack")
        .expect("path dependency missing from graph");
    assert_eq!(node.content_root.as_deref(), Some(vendored.as_path()));
    assert!(result.version_solution.missing.is_empty());
}

#[test]
fn content_root_cache_records_failures() {
    use crate::cache::{ContentRootCache, GitKey};

    let mut world = MockWorld::new();
    world.add_broken_git_repo("https://github.com/acme/flaky", "clone failed");
    let cache = ContentRootCache::new();
    let key = GitKey {
        url: "https://github.com/acme/flaky".to_owned(),
        reference: None,
        subpath: None,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let first = cache.resolve(key.clone(), &world.git).await;
        let second = cache.resolve(key, &world.git).await;
        assert_eq!(first.unwrap_err(), "clone failed");
        assert_eq!(second.unwrap_err(), "clone failed");
    });
    // the transport was only asked once; the failure was served from cache
    assert_eq!(
        world
            .git
            .load_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

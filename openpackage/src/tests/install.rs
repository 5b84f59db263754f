//! End-to-end install tests against the mock transports

use camino::Utf8PathBuf;
use openpackage_schema::{InstallReceipt, ReportStatus};

use crate::index::read_index;
use crate::install::install_workspace;
use crate::installer::InstallOptions;
use crate::resolver::ResolveOptions;

use super::mock::{git_dep, manifest_with_deps, MemoryOutput, MockWorld};

fn run_install(world: &MockWorld, options: InstallOptions, output: &MemoryOutput) -> InstallReceipt {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    runtime
        .block_on(install_workspace(
            &world.workspace_root(),
            &world.services(),
            ResolveOptions::default(),
            options,
            output,
        ))
        .unwrap()
}

#[test]
fn vendor_package_installs_onto_universal_target() {
    let mut world = MockWorld::new();
    world.add_package(
        "reviewer",
        "1.0.0",
        &[],
        &[(
            ".claude/agents/reviewer.md",
            "---\nname: reviewer\ntools: Read, Write\npermissionMode: default\n---\n# Reviewer\n",
        )],
    );
    world.set_root_manifest(&manifest_with_deps("root", None, &[("reviewer", "")]));

    let output = MemoryOutput::new();
    let receipt = run_install(&world, InstallOptions::default(), &output);
    assert_eq!(receipt.installed, 1);
    assert_eq!(receipt.failed, 0);

    let installed = world.workspace_root().join("agents/reviewer.md");
    let content = std::fs::read_to_string(&installed).unwrap();
    assert!(content.contains("- read"));
    assert!(content.contains("- write"));
    assert!(!content.contains("permissionMode"));

    // the index records ownership of the produced file
    let index = read_index(&world.workspace_root()).unwrap();
    assert_eq!(index.index.owner_of("agents/reviewer.md"), Some("reviewer"));
    assert_eq!(
        index.index.packages["reviewer"].version.as_deref(),
        Some("1.0.0")
    );
}

#[test]
fn universal_package_installs_onto_claude_target() {
    let mut world = MockWorld::new();
    world.add_package(
        "helper",
        "1.0.0",
        &[],
        &[(
            "agents/helper.md",
            "---\nname: helper\ntools:\n- read\n---\n# Helper\n",
        )],
    );
    world.set_root_manifest(&manifest_with_deps("root", None, &[("helper", "")]));

    let output = MemoryOutput::new();
    let options = InstallOptions {
        platforms: vec!["claude".to_owned()],
        ..Default::default()
    };
    let receipt = run_install(&world, options, &output);
    assert_eq!(receipt.installed, 1);

    let installed = world.workspace_root().join(".claude/agents/helper.md");
    let content = std::fs::read_to_string(&installed).unwrap();
    // the export direction lowers the tools array to claude's string form
    assert!(content.contains("tools: read"));
}

#[test]
fn wave_parallel_output_is_deterministic() {
    // two independent packages in the same wave, installed concurrently:
    // the combined output must be x's buffer then y's, in install order
    let mut world = MockWorld::new();
    world.add_package(
        "xpack",
        "1.0.0",
        &[],
        &[("agents/x.md", "---\nname: x\ntools:\n- read\n---\n# X\n")],
    );
    world.add_package(
        "ypack",
        "1.0.0",
        &[],
        &[("agents/y.md", "---\nname: y\ntools:\n- read\n---\n# Y\n")],
    );
    world.set_root_manifest(&manifest_with_deps(
        "root",
        None,
        &[("xpack", ""), ("ypack", "")],
    ));

    let output = MemoryOutput::new();
    let options = InstallOptions {
        concurrency: 2,
        ..Default::default()
    };
    let receipt = run_install(&world, options, &output);
    assert_eq!(receipt.installed, 2);

    let lines = output.lines();
    let x_at = lines
        .iter()
        .position(|line| line.contains("installing xpack"))
        .unwrap();
    let x_file_at = lines
        .iter()
        .position(|line| line.contains("agents/x.md"))
        .unwrap();
    let y_at = lines
        .iter()
        .position(|line| line.contains("installing ypack"))
        .unwrap();
    // x's whole buffer flushes before y's starts
    assert!(x_at < x_file_at);
    assert!(x_file_at < y_at);
}

#[test]
fn installing_twice_writes_nothing_the_second_time() {
    let mut world = MockWorld::new();
    world.add_package(
        "helper",
        "1.0.0",
        &[],
        &[("agents/helper.md", "---\nname: helper\ntools:\n- read\n---\n# H\n")],
    );
    world.set_root_manifest(&manifest_with_deps("root", None, &[("helper", "")]));

    let output = MemoryOutput::new();
    let first = run_install(&world, InstallOptions::default(), &output);
    assert_eq!(first.installed, 1);

    let second = run_install(&world, InstallOptions::default(), &output);
    assert_eq!(second.installed, 0);
    assert_eq!(second.skipped, 1);
    let report = second
        .results
        .iter()
        .find(|report| report.name == "helper")
        .unwrap();
    assert_eq!(report.status, ReportStatus::Skipped);
    assert_eq!(report.files_written, 0);
}

#[test]
fn force_reinstalls_and_keeps_ownership_clean() {
    let mut world = MockWorld::new();
    world.add_package(
        "helper",
        "1.0.0",
        &[],
        &[("agents/helper.md", "---\nname: helper\ntools:\n- read\n---\n# H\n")],
    );
    world.set_root_manifest(&manifest_with_deps("root", None, &[("helper", "")]));

    let output = MemoryOutput::new();
    run_install(&world, InstallOptions::default(), &output);
    let forced = run_install(
        &world,
        InstallOptions {
            force: true,
            ..Default::default()
        },
        &output,
    );
    assert_eq!(forced.installed, 1);
    // a reinstall of a package's own files must never be a conflict
    let report = forced
        .results
        .iter()
        .find(|report| report.name == "helper")
        .unwrap();
    assert!(report.conflicts.is_empty());
}

#[test]
fn conflicting_package_is_denied_then_forced() {
    // two packages both produce agents/shared.md; the second loses
    let mut world = MockWorld::new();
    world.add_package(
        "first",
        "1.0.0",
        &[],
        &[("agents/shared.md", "---\nname: first\ntools:\n- read\n---\n# 1\n")],
    );
    world.add_package(
        "second",
        "1.0.0",
        &[],
        &[("agents/shared.md", "---\nname: second\ntools:\n- read\n---\n# 2\n")],
    );
    world.set_root_manifest(&manifest_with_deps("root", None, &[("first", "")]));

    let output = MemoryOutput::new();
    run_install(&world, InstallOptions::default(), &output);

    world.set_root_manifest(&manifest_with_deps(
        "root",
        None,
        &[("first", ""), ("second", "")],
    ));
    let receipt = run_install(&world, InstallOptions::default(), &output);
    let report = receipt
        .results
        .iter()
        .find(|report| report.name == "second")
        .unwrap();
    assert_eq!(report.files_written, 0);
    assert!(report.conflicts.iter().any(|line| line.contains("first")));
    let content =
        std::fs::read_to_string(world.workspace_root().join("agents/shared.md")).unwrap();
    assert!(content.contains("# 1"));

    // force flips the outcome (sequential, so the reinstall of `first`
    // deterministically lands before `second`'s forced overwrite)
    let forced = run_install(
        &world,
        InstallOptions {
            force: true,
            concurrency: 1,
            ..Default::default()
        },
        &output,
    );
    assert_eq!(forced.failed, 0);
    let content =
        std::fs::read_to_string(world.workspace_root().join("agents/shared.md")).unwrap();
    assert!(content.contains("# 2"));
}

#[test]
fn marketplace_is_reported_skipped() {
    let mut world = MockWorld::new();
    world.add_git_repo(
        "https://github.com/acme/mega-market",
        &[],
        &[(".claude-plugin/plugin.json", "{}")],
        true,
    );
    let mut manifest = manifest_with_deps("root", None, &[]);
    manifest
        .dependencies
        .push(git_dep("https://github.com/acme/mega-market"));
    world.set_root_manifest(&manifest);

    let output = MemoryOutput::new();
    let receipt = run_install(&world, InstallOptions::default(), &output);
    assert_eq!(receipt.installed, 0);
    assert_eq!(receipt.skipped, 1);
    assert!(output
        .lines()
        .iter()
        .any(|line| line.contains("marketplace")));
}

#[test]
fn fail_fast_stops_later_waves() {
    // child is wave 2, parent wave 1; breaking the child's content root
    // after resolve makes its install fail, and fail-fast must keep the
    // parent's wave from starting
    let mut world = MockWorld::new();
    world.add_package(
        "child",
        "1.0.0",
        &[],
        &[("agents/c.md", "---\nname: c\ntools:\n- read\n---\n# C\n")],
    );
    world.add_package(
        "parent",
        "1.0.0",
        &[("child", "")],
        &[("agents/p.md", "---\nname: p\ntools:\n- read\n---\n# P\n")],
    );
    world.set_root_manifest(&manifest_with_deps("root", None, &[("parent", "")]));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let output = MemoryOutput::new();
    let receipt = runtime
        .block_on(async {
            let result = crate::resolve_workspace(
                &world.workspace_root(),
                &world.services(),
                ResolveOptions::default(),
            )
            .await
            .unwrap();
            // sabotage the child between resolve and install
            let child_root = result.graph.node("registry:child").unwrap().content_root.clone().unwrap();
            std::fs::remove_dir_all(&child_root).unwrap();
            let installer = crate::installer::WaveInstaller::new(
                &world.workspace_root(),
                InstallOptions {
                    fail_fast: true,
                    ..Default::default()
                },
                &output,
            );
            installer.install(&result).await
        })
        .unwrap();

    assert_eq!(receipt.failed, 1);
    assert_eq!(receipt.installed, 0);
    // the parent's wave never started
    assert!(!receipt.results.iter().any(|report| report.name == "parent"));
    assert!(!world
        .workspace_root()
        .join("agents/p.md")
        .as_std_path()
        .exists());
}

#[test]
fn prefixing_applies_to_filenames_not_root_files() {
    let mut world = MockWorld::new();
    world.add_package(
        "toolkit",
        "1.0.0",
        &[],
        &[
            ("agents/helper.md", "---\nname: helper\ntools:\n- read\n---\n# H\n"),
            ("AGENTS.md", "# Toolkit docs\n"),
        ],
    );
    world.set_root_manifest(&manifest_with_deps("root", None, &[("toolkit", "")]));

    let output = MemoryOutput::new();
    let options = InstallOptions {
        with_prefix: true,
        ..Default::default()
    };
    let receipt = run_install(&world, options, &output);
    assert_eq!(receipt.installed, 1);

    let workspace = world.workspace_root();
    assert!(workspace
        .join("agents/toolkit-helper.md")
        .as_std_path()
        .exists());
    // the documented root file keeps its name
    assert!(workspace.join("AGENTS.md").as_std_path().exists());
    assert!(!workspace.join("toolkit-AGENTS.md").as_std_path().exists());
}

#[test]
fn dependencies_install_before_dependents() {
    let mut world = MockWorld::new();
    world.add_package(
        "base",
        "1.0.0",
        &[],
        &[("agents/base.md", "---\nname: base\ntools:\n- read\n---\n# B\n")],
    );
    world.add_package(
        "app",
        "1.0.0",
        &[("base", "")],
        &[("agents/app.md", "---\nname: app\ntools:\n- read\n---\n# A\n")],
    );
    world.set_root_manifest(&manifest_with_deps("root", None, &[("app", "")]));

    let output = MemoryOutput::new();
    let receipt = run_install(&world, InstallOptions::default(), &output);
    assert_eq!(receipt.installed, 2);

    let lines = output.lines();
    let base_at = lines
        .iter()
        .position(|line| line.contains("installing base"))
        .unwrap();
    let app_at = lines
        .iter()
        .position(|line| line.contains("installing app"))
        .unwrap();
    assert!(base_at < app_at);

    // dependency edges land in the index
    let index = read_index(&world.workspace_root()).unwrap();
    assert_eq!(
        index.index.packages["app"].dependencies,
        vec!["base".to_owned()]
    );
}

#[test]
fn legacy_index_git_key_reads_as_path() {
    let world = MockWorld::new();
    let index_path = crate::index::index_path(&world.workspace_root());
    crate::fsutil::write_file(
        &index_path,
        "packages:\n  old-pack:\n    git: https://github.com/acme/old\n    files: {}\n",
    )
    .unwrap();
    let index = read_index(&world.workspace_root()).unwrap();
    assert_eq!(
        index.index.packages["old-pack"].path,
        "https://github.com/acme/old"
    );
}

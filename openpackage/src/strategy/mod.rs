//! Install strategies
//!
//! Four ways to materialize a package into the workspace, selected by the
//! detected source format and the target platform (first match wins):
//!
//! 1. direct copy: source already is the target layout, nothing to rename;
//! 2. path mapping: right dialect, but paths move (prefixing), content
//!    untouched;
//! 3. convert-then-install: wrong dialect, lift to universal in a scratch
//!    root, then flow-install that;
//! 4. flow-based: the general case, full transformations.
//!
//! Strategies write workspace files but never the index; their record of
//! what they wrote rides back on the outcome for the wave installer to
//! queue.

pub mod convert;
pub mod direct;
pub mod flow;
pub mod mapping;

use camino::Utf8PathBuf;
use openpackage_project::detect::{detect_format, PackageFormat};
use openpackage_project::platforms::{platform, universal_export_flows, UNIVERSAL};
use openpackage_project::scan::scan_package;
use openpackage_schema::{IndexPackage, IndexTarget, SortedMap};
use tracing::debug;

use crate::context::InstallContext;
use crate::errors::{OpError, OpResult};
use crate::installer::output::OutputPort;
use crate::ownership::OwnershipContext;
use crate::source::PackageSource;

/// Which strategy got picked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStrategy {
    /// 1:1 copy, metadata files skipped
    DirectCopy,
    /// flow engine for paths only, no content transformations
    PathMapping,
    /// convert to universal into a scratch root, then flow-based
    ConvertThenInstall,
    /// flow engine with full transformations
    FlowBased,
}

/// What one strategy run did
#[derive(Debug, Clone, Default)]
pub struct StrategyOutcome {
    /// Whether the package installed (conflicts don't fail a package;
    /// errors do)
    pub success: bool,
    /// Source files examined
    pub files_processed: usize,
    /// Workspace files written
    pub files_written: usize,
    /// Denied writes, as human-readable lines
    pub conflicts: Vec<String>,
    /// Failures (non-empty implies `!success`)
    pub errors: Vec<String>,
    /// Degraded-but-continuing conditions
    pub warnings: Vec<String>,
    /// Every workspace path written
    pub target_paths: Vec<Utf8PathBuf>,
    /// Source path → workspace paths
    pub file_mapping: SortedMap<String, Vec<String>>,
    /// Source path → index target entries (the deferred index mutation)
    pub index_files: SortedMap<String, Vec<IndexTarget>>,
}

impl StrategyOutcome {
    /// Fold another platform's outcome for the same package into this one
    pub fn absorb(&mut self, other: StrategyOutcome) {
        self.success &= other.success;
        self.files_processed = self.files_processed.max(other.files_processed);
        self.files_written += other.files_written;
        self.conflicts.extend(other.conflicts);
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.target_paths.extend(other.target_paths);
        for (source, mut targets) in other.file_mapping {
            self.file_mapping.entry(source).or_default().append(&mut targets);
        }
        for (source, mut targets) in other.index_files {
            self.index_files.entry(source).or_default().append(&mut targets);
        }
    }
}

/// Pick a strategy for one detected format / target platform pair
pub fn select_strategy(
    detected: &PackageFormat,
    target_platform: &str,
    with_prefix: bool,
) -> InstallStrategy {
    if detected.id() == target_platform {
        if with_prefix {
            // same dialect but filenames move
            InstallStrategy::PathMapping
        } else {
            InstallStrategy::DirectCopy
        }
    } else if matches!(detected, PackageFormat::Platform(_) | PackageFormat::Mixed) {
        InstallStrategy::ConvertThenInstall
    } else {
        InstallStrategy::FlowBased
    }
}

/// The flows that lower universal files into one target platform
pub fn export_flows_for(
    target_platform: &str,
) -> OpResult<&'static [openpackage_project::flows::Flow]> {
    if target_platform == UNIVERSAL {
        return Ok(universal_export_flows());
    }
    match platform(target_platform) {
        Some(spec) => Ok(&spec.export_flows),
        None => Err(OpError::Project(
            openpackage_project::ProjectError::UnknownPlatform {
                id: target_platform.to_owned(),
            },
        )),
    }
}

/// Run the right strategy for one package onto one target platform
pub fn run_strategy(
    ctx: &InstallContext,
    target_platform: &str,
    with_prefix: bool,
    prefix_separator: &str,
    force: bool,
    ownership: &OwnershipContext,
    output: &dyn OutputPort,
) -> OpResult<StrategyOutcome> {
    let content_root = ctx
        .content_root
        .as_ref()
        .ok_or_else(|| OpError::MissingContentRoot {
            package: ctx.package_name.clone(),
        })?;
    let files = scan_package(content_root)?;
    let detected = detect_format(&files);
    let strategy = select_strategy(&detected.package_format, target_platform, with_prefix);
    debug!(
        "{}: {:?} source onto {target_platform} via {strategy:?}",
        ctx.package_name, detected.package_format
    );

    match strategy {
        InstallStrategy::DirectCopy => {
            direct::direct_copy(ctx, &files, force, ownership, output)
        }
        InstallStrategy::PathMapping => mapping::path_mapping(
            ctx,
            &files,
            target_platform,
            with_prefix,
            prefix_separator,
            force,
            ownership,
            output,
        ),
        InstallStrategy::ConvertThenInstall => convert::convert_then_install(
            ctx,
            &files,
            &detected,
            target_platform,
            with_prefix,
            prefix_separator,
            force,
            ownership,
            output,
        ),
        InstallStrategy::FlowBased => flow::flow_install(
            ctx,
            &files,
            export_flows_for(target_platform)?,
            true,
            with_prefix,
            prefix_separator,
            force,
            ownership,
            output,
        ),
    }
}

/// The index `path` string for a package source
pub fn source_path_string(source: &PackageSource) -> String {
    match source {
        PackageSource::Registry { name } => format!("registry:{name}"),
        PackageSource::Git { url, .. } => url.clone(),
        PackageSource::Path { path } => path.to_string(),
    }
}

/// Assemble the deferred index record for a successful outcome
pub fn index_record_for(ctx: &InstallContext, outcome: &StrategyOutcome) -> IndexPackage {
    IndexPackage {
        path: source_path_string(&ctx.source),
        version: ctx.resolved_version.as_ref().map(|v| v.to_string()),
        dependencies: ctx.dependencies.clone(),
        files: outcome.index_files.clone(),
    }
}

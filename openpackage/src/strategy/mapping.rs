//! The path-mapping strategy
//!
//! The package is already in the target platform's dialect but its files
//! need to move (per-package prefixing), so the flow engine runs over the
//! platform's own layout identity-wise: paths shift, content and
//! frontmatter stay untouched.

use openpackage_project::flows::Flow;
use openpackage_project::platforms::{platform, universal_export_flows, UNIVERSAL};
use openpackage_project::PackageFile;

use crate::context::InstallContext;
use crate::errors::{OpError, OpResult};
use crate::installer::output::OutputPort;
use crate::ownership::OwnershipContext;

use super::flow::flow_install;
use super::StrategyOutcome;

/// Install via flows with content transformations disabled
#[allow(clippy::too_many_arguments)]
pub fn path_mapping(
    ctx: &InstallContext,
    files: &[PackageFile],
    target_platform: &str,
    with_prefix: bool,
    prefix_separator: &str,
    force: bool,
    ownership: &OwnershipContext,
    output: &dyn OutputPort,
) -> OpResult<StrategyOutcome> {
    let identity = identity_flows(target_platform)?;
    flow_install(
        ctx,
        files,
        &identity,
        false,
        with_prefix,
        prefix_separator,
        force,
        ownership,
        output,
    )
}

/// Identity flows over a platform's own layout
///
/// The platform's marker globs already describe everything it roots in the
/// workspace, so mapping each marker onto itself moves files without
/// changing dialect.
fn identity_flows(target_platform: &str) -> OpResult<Vec<Flow>> {
    if target_platform == UNIVERSAL {
        return Ok(universal_export_flows().to_vec());
    }
    let spec = platform(target_platform).ok_or_else(|| {
        OpError::Project(openpackage_project::ProjectError::UnknownPlatform {
            id: target_platform.to_owned(),
        })
    })?;
    Ok(spec
        .markers
        .iter()
        .map(|marker| Flow::new(marker.clone(), marker.clone()))
        .collect())
}

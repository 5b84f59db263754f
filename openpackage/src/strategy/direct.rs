//! The direct-copy strategy
//!
//! Source layout already matches the target platform, so files go over
//! 1:1. Package metadata (the manifest, marketplace manifests) stays
//! behind; ownership rules still apply.

use openpackage_project::platforms::METADATA_FILES;
use openpackage_project::PackageFile;

use crate::context::InstallContext;
use crate::errors::OpResult;
use crate::flow::PlannedWrite;
use crate::installer::output::OutputPort;
use crate::ownership::OwnershipContext;

use super::flow::execute_write;
use super::StrategyOutcome;

/// Copy files 1:1 into the workspace
pub fn direct_copy(
    ctx: &InstallContext,
    files: &[PackageFile],
    force: bool,
    ownership: &OwnershipContext,
    output: &dyn OutputPort,
) -> OpResult<StrategyOutcome> {
    let mut outcome = StrategyOutcome {
        success: true,
        files_processed: files.len(),
        ..Default::default()
    };
    for file in files {
        if METADATA_FILES.contains(&file.rel_path.as_str()) {
            continue;
        }
        let write = PlannedWrite {
            source: file.rel_path.clone(),
            target: file.rel_path.clone(),
            frontmatter: None,
            merge: false,
        };
        execute_write(ctx, files, &write, force, ownership, output, &mut outcome)?;
    }
    Ok(outcome)
}

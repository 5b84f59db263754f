//! The convert-then-install strategy
//!
//! The source is in the wrong dialect, so it's lifted into the universal
//! format first, materialized into a scratch content root, and the
//! flow-based strategy runs on that. The scratch root is cleaned up on
//! every exit path (the temp dir handle owns it).

use camino::Utf8PathBuf;
use openpackage_project::detect::DetectedFormat;
use openpackage_project::scan::scan_package;
use openpackage_project::PackageFile;
use tracing::debug;

use crate::context::InstallContext;
use crate::convert::convert_to_universal;
use crate::errors::OpResult;
use crate::fsutil::write_file;
use crate::installer::output::OutputPort;
use crate::ownership::OwnershipContext;

use super::flow::flow_install;
use super::{export_flows_for, StrategyOutcome};

/// Convert to universal in a scratch root, then flow-install the result
#[allow(clippy::too_many_arguments)]
pub fn convert_then_install(
    ctx: &InstallContext,
    files: &[PackageFile],
    detected: &DetectedFormat,
    target_platform: &str,
    with_prefix: bool,
    prefix_separator: &str,
    force: bool,
    ownership: &OwnershipContext,
    output: &dyn OutputPort,
) -> OpResult<StrategyOutcome> {
    let conversion = convert_to_universal(&ctx.package_name, files, detected);
    debug!(
        "{}: converted {} files ({} failed) for {target_platform}",
        ctx.package_name,
        conversion.files_converted,
        conversion.failed_files.len()
    );

    let scratch = temp_dir::TempDir::new()?;
    let scratch_root = Utf8PathBuf::from_path_buf(scratch.path().to_owned())
        .expect("temp dirs have UTF-8 paths");
    for file in &conversion.files {
        write_file(&scratch_root.join(&file.rel_path), &file.content)?;
    }
    let staged = scan_package(&scratch_root)?;

    let mut staged_ctx = ctx.clone();
    staged_ctx.content_root = Some(scratch_root);
    let mut outcome = flow_install(
        &staged_ctx,
        &staged,
        export_flows_for(target_platform)?,
        true,
        with_prefix,
        prefix_separator,
        force,
        ownership,
        output,
    )?;
    outcome.files_processed = files.len();
    outcome.warnings.extend(conversion.warnings);
    // the scratch root drops here, taking the staged tree with it
    Ok(outcome)
}

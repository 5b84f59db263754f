//! The flow-based strategy (the general case)
//!
//! Plans the package's files through the target platform's flows, prunes
//! the plan against the ownership context, and executes the surviving
//! writes. Merge-flagged targets append; everything else is a whole-file
//! write.

use openpackage_project::flows::Flow;
use openpackage_project::platforms::METADATA_FILES;
use openpackage_project::PackageFile;
use openpackage_schema::IndexTarget;
use tracing::debug;

use crate::context::InstallContext;
use crate::errors::OpResult;
use crate::flow::{plan_flows, FlowContext, PlannedWrite};
use crate::fsutil::{append_file, write_file};
use crate::installer::output::OutputPort;
use crate::ownership::{AllowReason, OwnershipContext, OwnershipDecision};

use super::StrategyOutcome;

/// Install via flows, with or without content transformations
#[allow(clippy::too_many_arguments)]
pub fn flow_install(
    ctx: &InstallContext,
    files: &[PackageFile],
    flows: &[Flow],
    apply_maps: bool,
    with_prefix: bool,
    prefix_separator: &str,
    force: bool,
    ownership: &OwnershipContext,
    output: &dyn OutputPort,
) -> OpResult<StrategyOutcome> {
    let mut flow_ctx = FlowContext::new(
        ctx.package_name.clone(),
        ctx.content_root.clone().unwrap_or_default(),
        ctx.target_dir.clone(),
    );
    flow_ctx.with_prefix = with_prefix;
    flow_ctx.prefix_separator = prefix_separator.to_owned();

    let stripped: Vec<Flow>;
    let flows = if apply_maps {
        flows
    } else {
        stripped = flows
            .iter()
            .map(|flow| {
                let mut flow = flow.clone();
                flow.map.clear();
                flow
            })
            .collect();
        &stripped
    };

    let plan = plan_flows(files, flows, &flow_ctx);
    let mut outcome = StrategyOutcome {
        success: true,
        files_processed: files.len(),
        warnings: plan.warnings.clone(),
        ..Default::default()
    };
    for unmatched in &plan.unmatched {
        debug!("{}: no flow covers {unmatched}, skipping", ctx.package_name);
    }

    for write in &plan.writes {
        if METADATA_FILES.contains(&write.source.as_str()) {
            continue;
        }
        execute_write(ctx, files, write, force, ownership, output, &mut outcome)?;
    }
    Ok(outcome)
}

/// Execute one planned write, ownership permitting
pub fn execute_write(
    ctx: &InstallContext,
    files: &[PackageFile],
    write: &PlannedWrite,
    force: bool,
    ownership: &OwnershipContext,
    output: &dyn OutputPort,
    outcome: &mut StrategyOutcome,
) -> OpResult<()> {
    let target_abs = ctx.target_dir.join(&write.target);
    let exists = target_abs.as_std_path().is_file();
    match ownership.decide(write.target.as_str(), exists, force) {
        OwnershipDecision::Deny { owner } => {
            outcome.conflicts.push(format!(
                "{} is owned by {owner}; skipping (use force to overwrite)",
                write.target
            ));
            return Ok(());
        }
        OwnershipDecision::Allow(AllowReason::UnownedClaim) => {
            outcome.warnings.push(format!(
                "{} existed but was unowned; {} is claiming it",
                write.target, ctx.package_name
            ));
        }
        OwnershipDecision::Allow(AllowReason::Forced) => {
            outcome
                .warnings
                .push(format!("{}: overwriting by force", write.target));
        }
        OwnershipDecision::Allow(_) => {}
    }

    let Some(source) = files.iter().find(|f| f.rel_path == write.source) else {
        return Ok(());
    };
    let rendered = match &write.frontmatter {
        Some(frontmatter) => {
            let staged = PackageFile {
                rel_path: source.rel_path.clone(),
                content: source.content.clone(),
                frontmatter: Some(frontmatter.clone()),
            };
            staged.render()?
        }
        None => source.content.clone(),
    };

    if write.merge {
        let mut chunk = source.body().trim_end_matches('\n').to_owned();
        chunk.push('\n');
        if exists {
            append_file(&target_abs, &format!("\n{chunk}"))?;
        } else {
            write_file(&target_abs, &chunk)?;
        }
        output.line(&format!("  ~ {} (merged)", write.target));
    } else {
        write_file(&target_abs, &rendered)?;
        output.line(&format!("  + {}", write.target));
    }

    outcome.files_written += 1;
    outcome.target_paths.push(write.target.clone());
    outcome
        .file_mapping
        .entry(write.source.to_string())
        .or_default()
        .push(write.target.to_string());
    let entry = if write.merge {
        IndexTarget::Merged {
            target: write.target.to_string(),
            merge: true,
        }
    } else {
        IndexTarget::Plain(write.target.to_string())
    };
    outcome
        .index_files
        .entry(write.source.to_string())
        .or_default()
        .push(entry);
    Ok(())
}

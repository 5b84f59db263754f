//! The format converter
//!
//! Takes a vendor-specific (or mixed) package and lifts it into the
//! universal format: group files by their detected format, run each
//! platform group through its import flows, and merge the results. Per-file
//! failures degrade the package rather than aborting it; the merged output
//! is then checked against the universal-format predicate.

use camino::Utf8PathBuf;
use openpackage_project::detect::{DetectedFormat, UNKNOWN_GROUP};
use openpackage_project::platforms::{platform, vendor_exclusive_fields, UNIVERSAL};
use openpackage_project::PackageFile;
use openpackage_schema::SortedMap;
use tracing::{debug, warn};

use crate::flow::{plan_flows, FlowContext, FlowPlan};

/// What a conversion produced
#[derive(Debug, Clone, Default)]
pub struct ConversionOutcome {
    /// The merged universal-format files
    pub files: Vec<PackageFile>,
    /// How many files actually went through an import flow
    pub files_converted: usize,
    /// Per-file failures (path → reason); these files are absent from the
    /// output
    pub failed_files: SortedMap<String, String>,
    /// Conversion warnings (failures restated, universal-shape violations)
    pub warnings: Vec<String>,
}

/// Working state for one conversion run
///
/// Buckets per group, the error map, and the per-platform flow lists the
/// groups resolve against.
struct ConversionContext {
    merged: SortedMap<Utf8PathBuf, PackageFile>,
    failed: SortedMap<String, String>,
    warnings: Vec<String>,
    converted: usize,
}

/// Convert a package's files into the universal format
pub fn convert_to_universal(
    package_name: &str,
    files: &[PackageFile],
    detected: &DetectedFormat,
) -> ConversionOutcome {
    let mut ctx = ConversionContext {
        merged: SortedMap::new(),
        failed: SortedMap::new(),
        warnings: Vec::new(),
        converted: 0,
    };

    // groups merge in distribution order, so the dominant format's files win
    // ties against stragglers
    let mut group_order = detected.distribution_order();
    for group in detected.format_groups.keys() {
        if !group_order.contains(group) {
            group_order.push(group.clone());
        }
    }

    for group in &group_order {
        let Some(members) = detected.format_groups.get(group) else {
            continue;
        };
        let group_files: Vec<PackageFile> = files
            .iter()
            .filter(|file| members.contains(&file.rel_path))
            .cloned()
            .collect();

        if group == UNIVERSAL {
            for file in group_files {
                merge_file(&mut ctx, file, false);
            }
            continue;
        }
        if group == UNKNOWN_GROUP {
            for file in group_files {
                let reason = "file matches no recognized format".to_owned();
                warn!("can't convert {}: {reason}", file.rel_path);
                ctx.failed.insert(file.rel_path.to_string(), reason);
            }
            continue;
        }
        let Some(spec) = platform(group) else {
            for file in group_files {
                ctx.failed.insert(
                    file.rel_path.to_string(),
                    format!("no importer for format '{group}'"),
                );
            }
            continue;
        };

        let flow_ctx = FlowContext::new(package_name, "", "");
        let plan: FlowPlan = plan_flows(&group_files, &spec.import_flows, &flow_ctx);
        ctx.warnings.extend(plan.warnings.clone());

        for write in &plan.writes {
            let Some(source) = group_files.iter().find(|f| f.rel_path == write.source) else {
                continue;
            };
            let mut converted = PackageFile {
                rel_path: write.target.clone(),
                content: source.content.clone(),
                frontmatter: write.frontmatter.clone(),
            };
            match converted.render() {
                Ok(content) => converted.content = content,
                Err(details) => {
                    ctx.failed
                        .insert(source.rel_path.to_string(), details.to_string());
                    continue;
                }
            }
            ctx.converted += 1;
            merge_file(&mut ctx, converted, write.merge);
        }
        // files the platform's flows don't cover pass through unchanged
        for unmatched in &plan.unmatched {
            if let Some(file) = group_files.iter().find(|f| &f.rel_path == unmatched) {
                merge_file(&mut ctx, file.clone(), false);
            }
        }
    }

    let ConversionContext {
        merged,
        failed,
        mut warnings,
        converted,
    } = ctx;
    for (path, reason) in &failed {
        warnings.push(format!("couldn't convert {path}: {reason}"));
    }
    let files: Vec<PackageFile> = merged.into_values().collect();
    warnings.extend(validate_universal(&files));

    ConversionOutcome {
        files,
        files_converted: converted,
        failed_files: failed,
        warnings,
    }
}

/// Merge one converted file into the output set
///
/// Conflict rule on duplicate targets: prefer the universal-shaped file;
/// still tied, the earlier group (we merge in distribution order) keeps the
/// slot. Merge-flagged writes append instead of competing.
fn merge_file(ctx: &mut ConversionContext, file: PackageFile, merge: bool) {
    match ctx.merged.get_mut(&file.rel_path) {
        None => {
            ctx.merged.insert(file.rel_path.clone(), file);
        }
        Some(existing) if merge => {
            existing.content = format!(
                "{}\n{}",
                existing.content.trim_end_matches('\n'),
                file.body()
            );
        }
        Some(existing) => {
            let existing_universal = is_universal_file(existing);
            let incoming_universal = is_universal_file(&file);
            if incoming_universal && !existing_universal {
                debug!(
                    "merge conflict on {}: universal-shaped file wins",
                    file.rel_path
                );
                *existing = file;
            }
        }
    }
}

/// Whether one file satisfies the universal shape
///
/// Array-typed `tools` (when present) and no vendor-exclusive fields.
pub fn is_universal_file(file: &PackageFile) -> bool {
    let Some(frontmatter) = &file.frontmatter else {
        return true;
    };
    if let Some(tools) = frontmatter.get("tools") {
        if !tools.is_array() {
            return false;
        }
    }
    !vendor_exclusive_fields()
        .iter()
        .any(|field| frontmatter.contains_key(*field))
}

/// Check a merged package against the universal-format predicate
///
/// Returns one warning line per violating file.
pub fn validate_universal(files: &[PackageFile]) -> Vec<String> {
    files
        .iter()
        .filter(|file| !is_universal_file(file))
        .map(|file| {
            format!(
                "{} is not universal-format (vendor fields or non-array tools remain)",
                file.rel_path
            )
        })
        .collect()
}

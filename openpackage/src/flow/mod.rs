//! The flow engine
//!
//! Evaluates declarative flows over a package's files: structural case
//! analysis on the `from`/`to` pattern trees, capture-aware glob matching,
//! switch-expression targets, the frontmatter map pipeline, and final
//! target-path resolution with per-package prefixing. The engine only
//! *plans* (deciding which source produces which target with what
//! frontmatter), so the same logic serves installs, conversions, and the
//! pre-write ownership check.

pub mod map;
pub mod pattern;
pub mod switch;
pub mod target;

use camino::Utf8PathBuf;
use openpackage_project::flows::{Flow, FlowPattern};
use openpackage_project::{Frontmatter, PackageFile};
use tracing::debug;

pub use target::FlowContext;

use self::map::apply_map;
use self::pattern::match_with_captures;
use self::switch::eval_switch;
use self::target::resolve_target;

/// One planned source → target write
#[derive(Debug, Clone)]
pub struct PlannedWrite {
    /// Source path, relative to the content root
    pub source: Utf8PathBuf,
    /// Target path, relative to the workspace root
    pub target: Utf8PathBuf,
    /// The frontmatter after the flow's map pipeline ran
    pub frontmatter: Option<Frontmatter>,
    /// Whether this write merges into a shared file
    pub merge: bool,
}

/// Everything a set of flows plans to do with a package
#[derive(Debug, Clone, Default)]
pub struct FlowPlan {
    /// The planned writes, in flow order then file order
    pub writes: Vec<PlannedWrite>,
    /// Files no flow covered
    pub unmatched: Vec<Utf8PathBuf>,
    /// Pattern-resolution warnings (priority skips, empty lists)
    pub warnings: Vec<String>,
}

/// Plan a set of flows over a package's files
///
/// Each file is claimed by the first flow whose `from` matches it; later
/// flows only see what's left.
pub fn plan_flows(files: &[PackageFile], flows: &[Flow], ctx: &FlowContext) -> FlowPlan {
    let mut plan = FlowPlan::default();
    let mut claimed = vec![false; files.len()];

    for flow in flows {
        let matches = resolve_from(&flow.from, files, &claimed, ctx, &mut plan.warnings);
        for (index, captures) in matches {
            claimed[index] = true;
            let file = &files[index];

            let raw_to = match &flow.to {
                FlowPattern::Literal(pattern) => pattern.clone(),
                FlowPattern::Switch(expr) => {
                    match eval_switch(expr, file.frontmatter.as_ref(), ctx) {
                        Some(pattern) => pattern,
                        // no case, no default: the path passes through
                        None => file.rel_path.to_string(),
                    }
                }
                FlowPattern::Priority(patterns) => {
                    plan.warnings.push(format!(
                        "target of flow from {:?} is a priority list; using its first entry",
                        flow.from
                    ));
                    match patterns.first() {
                        Some(pattern) => pattern.clone(),
                        None => file.rel_path.to_string(),
                    }
                }
            };

            let target = resolve_target(&file.rel_path, &captures, &raw_to, ctx);
            let mut frontmatter = file.frontmatter.clone();
            apply_map(&flow.map, &mut frontmatter);
            debug!("flow: {} -> {target}", file.rel_path);
            plan.writes.push(PlannedWrite {
                source: file.rel_path.clone(),
                target,
                frontmatter,
                merge: flow.merge,
            });
        }
    }

    for (index, file) in files.iter().enumerate() {
        if !claimed[index] {
            plan.unmatched.push(file.rel_path.clone());
        }
    }
    plan
}

/// Resolve a `from` pattern into `(file index, captures)` matches over the
/// unclaimed files
fn resolve_from(
    from: &FlowPattern,
    files: &[PackageFile],
    claimed: &[bool],
    ctx: &FlowContext,
    warnings: &mut Vec<String>,
) -> Vec<(usize, Vec<String>)> {
    let match_one = |pattern: &str| -> Vec<(usize, Vec<String>)> {
        files
            .iter()
            .enumerate()
            .filter(|(index, _)| !claimed[*index])
            .filter_map(|(index, file)| {
                match_with_captures(pattern, file.rel_path.as_str())
                    .map(|captures| (index, captures))
            })
            .collect()
    };

    match from {
        FlowPattern::Literal(pattern) => match_one(pattern),
        FlowPattern::Priority(patterns) => {
            if patterns.is_empty() {
                warnings.push("a flow has an empty priority list; nothing matched".to_owned());
                return Vec::new();
            }
            let mut sets: Vec<(usize, Vec<(usize, Vec<String>)>)> = Vec::new();
            for (position, pattern) in patterns.iter().enumerate() {
                let matched = match_one(pattern);
                if !matched.is_empty() {
                    sets.push((position, matched));
                }
            }
            let Some((winner, matched)) = sets.first().cloned() else {
                return Vec::new();
            };
            if sets.len() > 1 {
                let skipped: Vec<&str> = sets[1..]
                    .iter()
                    .map(|(position, _)| patterns[*position].as_str())
                    .collect();
                warnings.push(format!(
                    "priority pattern '{}' won; skipped patterns that also matched: {}",
                    patterns[winner],
                    skipped.join(", ")
                ));
            }
            matched
        }
        FlowPattern::Switch(expr) => match eval_switch(expr, None, ctx) {
            Some(pattern) => match_one(&pattern),
            None => Vec::new(),
        },
    }
}

//! Target path resolution
//!
//! Turns a matched source path plus a raw `to` pattern into the final
//! workspace-relative target: substitute `$$` context variables, splice the
//! glob fragments captured by the `from` pattern, then apply per-package
//! filename prefixing (with the skills-directory and root-file special
//! cases).

use camino::{Utf8Path, Utf8PathBuf};
use openpackage_project::platforms::is_root_file;
use openpackage_schema::SortedMap;

use super::pattern::{has_wildcards, splice_captures};

/// Everything target resolution needs to know about the install at hand
#[derive(Debug, Clone)]
pub struct FlowContext {
    /// The package's full name (may carry `@scope/` or marketplace
    /// qualifiers)
    pub package_name: String,
    /// Whether filenames get the package's short name prepended
    pub with_prefix: bool,
    /// Separator between the prefix and the original name
    pub prefix_separator: String,
    /// The content root files are read from
    pub source_cwd: Utf8PathBuf,
    /// The workspace root files land under
    pub target_root: Utf8PathBuf,
    /// Extra context values switch expressions can match on
    pub vars: SortedMap<String, String>,
}

impl FlowContext {
    /// A context with prefixing off and no extra vars
    pub fn new(
        package_name: impl Into<String>,
        source_cwd: impl Into<Utf8PathBuf>,
        target_root: impl Into<Utf8PathBuf>,
    ) -> Self {
        FlowContext {
            package_name: package_name.into(),
            with_prefix: false,
            prefix_separator: "-".to_owned(),
            source_cwd: source_cwd.into(),
            target_root: target_root.into(),
            vars: SortedMap::new(),
        }
    }

    /// The package's short name: qualifiers stripped, final segment kept
    ///
    /// `@acme/mega-market/reviewer` and `reviewer` both yield `reviewer`.
    pub fn short_name(&self) -> &str {
        self.package_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.package_name)
    }
}

/// Resolve the workspace-relative target for one matched source file
pub fn resolve_target(
    source_rel: &Utf8Path,
    captures: &[String],
    raw_to: &str,
    ctx: &FlowContext,
) -> Utf8PathBuf {
    let substituted = substitute_vars(raw_to, source_rel, ctx);
    let resolved = if has_wildcards(&substituted) {
        splice_captures(&substituted, captures)
    } else {
        substituted
    };
    apply_prefix(Utf8PathBuf::from(resolved), ctx)
}

/// Substitute `$$` context variables into a raw pattern
fn substitute_vars(raw: &str, source_rel: &Utf8Path, ctx: &FlowContext) -> String {
    let filename = source_rel
        .file_stem()
        .unwrap_or_default()
        .trim_start_matches('.')
        .to_owned();
    let dirname = source_rel
        .parent()
        .and_then(|parent| parent.file_name())
        .unwrap_or_default()
        .to_owned();
    let ext = source_rel.extension().unwrap_or_default().to_owned();

    let mut out = raw.to_owned();
    // longest tokens first so `$$path` never clobbers `$$pathSomething`
    out = out.replace("$$sourceCwd", ctx.source_cwd.as_str());
    out = out.replace("$$targetRoot", ctx.target_root.as_str());
    out = out.replace("$$filename", &filename);
    out = out.replace("$$dirname", &dirname);
    out = out.replace("$$path", source_rel.as_str());
    out = out.replace("$$ext", &ext);
    for (key, value) in &ctx.vars {
        out = out.replace(&format!("$${key}"), value);
    }
    out
}

/// Prepend the package's short name per the prefixing rules
///
/// Documented root files are never prefixed. Inside a `skills/` tree the
/// skill's directory gets the prefix instead of the file, so a skill's
/// internal references stay intact.
fn apply_prefix(rel: Utf8PathBuf, ctx: &FlowContext) -> Utf8PathBuf {
    if !ctx.with_prefix || is_root_file(rel.as_str()) {
        return rel;
    }
    let prefix = format!("{}{}", ctx.short_name(), ctx.prefix_separator);
    let segments: Vec<&str> = rel.as_str().split('/').collect();

    if let Some(skills_at) = segments.iter().position(|segment| *segment == "skills") {
        if segments.len() > skills_at + 2 {
            let mut out = segments.clone();
            let prefixed = format!("{prefix}{}", out[skills_at + 1]);
            out[skills_at + 1] = &prefixed;
            return Utf8PathBuf::from(out.join("/"));
        }
    }

    let mut out = segments;
    let last = out.len() - 1;
    let prefixed = format!("{prefix}{}", out[last]);
    out[last] = &prefixed;
    Utf8PathBuf::from(out.join("/"))
}

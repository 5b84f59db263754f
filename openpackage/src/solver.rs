//! Per-package version solving
//!
//! Combines every constraint range that reached a package, filters the
//! available versions to those satisfying all of them (with
//! include-prerelease semantics), and picks the highest: locally first,
//! falling back to the remote registry when the mode allows.
//!
//! Two policy points are deliberate and load-bearing:
//!
//! - root overrides **replace** descendant constraints rather than
//!   intersecting with them (that branch lives in the resolver, which knows
//!   which edges are root edges; by the time ranges get here the replacement
//!   already happened);
//! - a workspace/global *mutable* install pins the package: a constraint
//!   that excludes the pin is fatal, never silently resolved past.

use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use tracing::{debug, warn};

use crate::errors::{OpError, OpResult};
use crate::fetch::RegistryClient;

/// How far the solver may reach for versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionMode {
    /// Never touch the network
    LocalOnly,
    /// Local versions first, remote as a fallback; remote failures degrade
    /// to missing-package warnings
    #[default]
    Default,
    /// Consult the remote first; remote failures are fatal
    RemotePrimary,
}

/// The outcome of solving one package
#[derive(Debug, Clone, Default)]
pub struct SolveOutcome {
    /// The selected version; `None` means the package is missing
    pub version: Option<Version>,
    /// Degraded-but-continuing conditions worth surfacing
    pub warnings: Vec<String>,
}

/// A recorded constraint conflict
#[derive(Debug, Clone, PartialEq)]
pub struct VersionConflictInfo {
    /// the package in conflict
    pub package: String,
    /// every range in play
    pub ranges: Vec<String>,
    /// which dependents asked
    pub requested_by: Vec<String>,
}

/// Normalize a constraint string; `None` means "no constraint"
pub fn normalize_constraint(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "*" || trimmed == "latest" {
        return None;
    }
    Some(trimmed.to_owned())
}

/// Solve one package's version from its combined ranges
pub async fn solve_version(
    package: &str,
    ranges: &[String],
    requested_by: &[String],
    registry: &dyn RegistryClient,
    mode: ResolutionMode,
) -> OpResult<SolveOutcome> {
    let mut reqs = Vec::new();
    let mut kept_ranges = Vec::new();
    for range in ranges {
        let Some(normalized) = normalize_constraint(range) else {
            continue;
        };
        let req = VersionReq::parse(&normalized).map_err(|details| OpError::BadConstraint {
            package: package.to_owned(),
            range: normalized.clone(),
            details,
        })?;
        if !kept_ranges.contains(&normalized) {
            kept_ranges.push(normalized);
            reqs.push(req);
        }
    }

    // a mutable install pins the package outright
    if let Some(pinned) = registry.pinned_version(package).await? {
        for (req, range) in reqs.iter().zip(&kept_ranges) {
            if !matches_include_prerelease(req, &pinned) {
                return Err(OpError::PinnedVersionConflict {
                    package: package.to_owned(),
                    pinned,
                    range: range.clone(),
                });
            }
        }
        debug!("{package}: pinned at {pinned}");
        return Ok(SolveOutcome {
            version: Some(pinned),
            warnings: Vec::new(),
        });
    }

    let mut warnings = Vec::new();
    let satisfies =
        |v: &Version| reqs.iter().all(|req| matches_include_prerelease(req, v));

    let local = registry.local_versions(package).await?;
    let mut candidates_seen = !local.is_empty();

    if mode != ResolutionMode::RemotePrimary {
        if let Some(best) = local.iter().filter(|v| satisfies(v)).max().cloned() {
            debug!("{package}: resolved {best} locally");
            return Ok(SolveOutcome {
                version: Some(best),
                warnings,
            });
        }
        if mode == ResolutionMode::LocalOnly {
            return finish_unsatisfied(package, &kept_ranges, requested_by, candidates_seen, warnings);
        }
    }

    match registry.remote_versions(package).await {
        Ok(remote) => {
            candidates_seen |= !remote.is_empty();
            let best = remote
                .iter()
                .chain(local.iter())
                .filter(|v| satisfies(v))
                .max()
                .cloned();
            if let Some(best) = best {
                debug!("{package}: resolved {best} via remote");
                return Ok(SolveOutcome {
                    version: Some(best),
                    warnings,
                });
            }
            finish_unsatisfied(package, &kept_ranges, requested_by, candidates_seen, warnings)
        }
        Err(remote_error) => {
            if mode == ResolutionMode::RemotePrimary {
                return Err(OpError::RemoteFailure {
                    package: package.to_owned(),
                    kind: remote_error.kind,
                    details: remote_error.details,
                });
            }
            warn!("{package}: remote lookup failed, treating as missing: {remote_error}");
            warnings.push(format!(
                "registry lookup of {package} failed ({remote_error}); continuing without it"
            ));
            // local candidates may still decide between conflict and missing
            finish_unsatisfied(package, &kept_ranges, requested_by, candidates_seen, warnings)
        }
    }
}

fn finish_unsatisfied(
    package: &str,
    ranges: &[String],
    requested_by: &[String],
    candidates_seen: bool,
    warnings: Vec<String>,
) -> OpResult<SolveOutcome> {
    if candidates_seen && !ranges.is_empty() {
        return Err(OpError::VersionConflict {
            package: package.to_owned(),
            ranges: ranges.to_vec(),
            requested_by: requested_by.to_vec(),
        });
    }
    Ok(SolveOutcome {
        version: None,
        warnings,
    })
}

/// `VersionReq::matches` with include-prerelease semantics
///
/// Stock semver refuses to match a prerelease version unless the comparator
/// itself names a prerelease on the same triple. Registries in this
/// ecosystem follow node-semver's `includePrerelease` behavior instead: a
/// prerelease candidate satisfies a range whenever its ordering does. For
/// release versions this is exactly `VersionReq::matches`.
pub fn matches_include_prerelease(req: &VersionReq, version: &Version) -> bool {
    if version.pre.is_empty() {
        return req.matches(version);
    }
    req.comparators
        .iter()
        .all(|comparator| comparator_matches_prerelease(comparator, version))
}

/// One comparator, evaluated by ordering the way node-semver desugars
/// ranges: lower bounds compare plainly, upper bounds get a `-0` floor so
/// prereleases of the bounding triple stay excluded.
fn comparator_matches_prerelease(comparator: &Comparator, version: &Version) -> bool {
    let bound = comparator_bound(comparator);
    let full = comparator.minor.is_some() && comparator.patch.is_some();
    match comparator.op {
        Op::Exact => {
            if full {
                *version == bound
            } else {
                // `=1.2` is the 1.2.* range
                *version >= bound && *version < next_floor(comparator)
            }
        }
        Op::Greater => {
            if full {
                *version > bound
            } else {
                // `>1.2` means past every 1.2.*
                *version >= next_floor(comparator)
            }
        }
        Op::GreaterEq => *version >= bound,
        Op::Less => {
            if full {
                *version < bound
            } else {
                // `<1.2` excludes 1.2.0's prereleases too
                *version < floor_of(bound)
            }
        }
        Op::LessEq => {
            if full {
                *version <= bound
            } else {
                *version < next_floor(comparator)
            }
        }
        Op::Tilde => *version >= bound && *version < next_floor(comparator),
        Op::Caret => {
            let upper = if comparator.major > 0 {
                floor_version(comparator.major + 1, 0, 0)
            } else {
                match (comparator.minor, comparator.patch) {
                    (None, _) => floor_version(1, 0, 0),
                    (Some(0), Some(patch)) => floor_version(0, 0, patch + 1),
                    (Some(0), None) => floor_version(0, 1, 0),
                    (Some(minor), _) => floor_version(0, minor + 1, 0),
                }
            };
            *version >= bound && *version < upper
        }
        Op::Wildcard => *version >= bound && *version < next_floor(comparator),
        _ => {
            // future semver ops: fall back to strict matching
            VersionReq {
                comparators: vec![comparator.clone()],
            }
            .matches(version)
        }
    }
}

/// The version a comparator literally names, zero-filled
fn comparator_bound(comparator: &Comparator) -> Version {
    let mut bound = Version::new(
        comparator.major,
        comparator.minor.unwrap_or(0),
        comparator.patch.unwrap_or(0),
    );
    bound.pre = comparator.pre.clone();
    bound
}

/// The `-0` floor of the next triple up from a partial comparator
///
/// `~1.2` / `<=1.2` / `1.2.*` all share this upper bound (`1.3.0-0`);
/// `~1` / `1.*` get `2.0.0-0`.
fn next_floor(comparator: &Comparator) -> Version {
    match comparator.minor {
        Some(minor) => floor_version(comparator.major, minor + 1, 0),
        None => floor_version(comparator.major + 1, 0, 0),
    }
}

/// A version's own `-0` floor (smallest version of its triple)
fn floor_of(version: Version) -> Version {
    floor_version(version.major, version.minor, version.patch)
}

/// `major.minor.patch-0`: the smallest version of a triple
fn floor_version(major: u64, minor: u64, patch: u64) -> Version {
    let mut version = Version::new(major, minor, patch);
    version.pre = Prerelease::new("0").unwrap();
    version
}

//! The user-typed dependency input grammar
//!
//! `openpackage add <spec>` and friends accept a loose grammar that has to
//! be classified deterministically before the resolver can touch it:
//! recognized git hosts and the `gh@owner/repo` shorthand are git, existing
//! paths are local (dependency mode when a manifest is present, copy mode
//! otherwise), a trailing slash means a directory target, and everything
//! else is a registry `name[@version][/subpath]`.

use camino::{Utf8Path, Utf8PathBuf};
use openpackage_schema::MANIFEST_FILE_NAME;

use crate::errors::{OpError, OpResult};
use crate::source::{normalize_git_url, resolve_path};

/// Git hosts we recognize from a bare `host/owner/repo` spelling
const KNOWN_GIT_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org"];

/// What a user-typed spec turned out to mean
#[derive(Debug, Clone, PartialEq)]
pub enum PackageSpec {
    /// A registry package
    Registry {
        /// the package name (may be `@scope/name`)
        name: String,
        /// a version constraint, from `name@version`
        version: Option<String>,
        /// a subpath within the package, from `name/sub/path`
        subpath: Option<String>,
    },
    /// A git repository
    Git {
        /// normalized url
        url: String,
        /// ref split off `#ref`
        reference: Option<String>,
        /// in-repo subdirectory
        subpath: Option<String>,
    },
    /// A local directory with a manifest: install as a dependency
    LocalDependency {
        /// absolute path
        path: Utf8PathBuf,
    },
    /// A local file or manifest-less directory: copy its contents in
    LocalCopy {
        /// absolute path
        path: Utf8PathBuf,
    },
    /// A directory target (input had a trailing slash)
    Directory {
        /// absolute path
        path: Utf8PathBuf,
    },
}

/// Classify a user-typed spec
///
/// `force_copy` is the `--copy` flag; it forces copy mode for local inputs
/// and is ignored for everything else.
pub fn classify_spec(input: &str, cwd: &Utf8Path, force_copy: bool) -> OpResult<PackageSpec> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(OpError::UnrecognizedSpec {
            input: input.to_owned(),
        });
    }

    if looks_like_git(trimmed) {
        let git = normalize_git_url(trimmed)?;
        return Ok(PackageSpec::Git {
            url: git.url,
            reference: git.reference,
            subpath: git.subpath,
        });
    }

    let as_path = resolve_path(cwd, Utf8Path::new(trimmed));
    if as_path.as_std_path().exists() {
        if trimmed.ends_with('/') {
            return Ok(PackageSpec::Directory { path: as_path });
        }
        if as_path.as_std_path().is_dir() {
            let has_manifest = as_path.join(MANIFEST_FILE_NAME).as_std_path().is_file();
            return Ok(if has_manifest && !force_copy {
                PackageSpec::LocalDependency { path: as_path }
            } else {
                PackageSpec::LocalCopy { path: as_path }
            });
        }
        return Ok(PackageSpec::LocalCopy { path: as_path });
    }
    if trimmed.ends_with('/') {
        return Ok(PackageSpec::Directory { path: as_path });
    }

    // a bare filename that doesn't exist is a typo, not a registry name
    if Utf8Path::new(trimmed).extension().is_some() && !trimmed.contains('/') {
        return Err(OpError::UnrecognizedSpec {
            input: input.to_owned(),
        });
    }

    parse_registry_spec(trimmed).ok_or_else(|| OpError::UnrecognizedSpec {
        input: input.to_owned(),
    })
}

/// `name[@version][/subpath]`, where name itself may be `@scope/name`
fn parse_registry_spec(input: &str) -> Option<PackageSpec> {
    // split a scope prefix off so its `@` doesn't read as a version
    let (scope, rest) = match input.strip_prefix('@') {
        Some(rest) => {
            let (scope, rest) = rest.split_once('/')?;
            (Some(scope), rest)
        }
        None => (None, input),
    };

    let (name_and_version, subpath) = match rest.split_once('/') {
        Some((head, tail)) if !tail.is_empty() => (head, Some(tail.to_owned())),
        Some((head, _)) => (head, None),
        None => (rest, None),
    };
    let (name, version) = match name_and_version.split_once('@') {
        Some((name, version)) if !version.is_empty() => (name, Some(version.to_owned())),
        Some((name, _)) => (name, None),
        None => (name_and_version, None),
    };
    if name.is_empty() || !is_valid_name(name) {
        return None;
    }
    let name = match scope {
        Some(scope) => format!("@{scope}/{name}"),
        None => name.to_owned(),
    };
    Some(PackageSpec::Registry {
        name,
        version,
        subpath,
    })
}

fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn looks_like_git(input: &str) -> bool {
    if input.starts_with("gh@") || input.starts_with("git@") {
        return true;
    }
    if input.contains("://") {
        return true;
    }
    KNOWN_GIT_HOSTS
        .iter()
        .any(|host| input.starts_with(&format!("{host}/")))
}

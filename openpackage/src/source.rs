//! Source addressing
//!
//! Canonicalizes a dependency declaration into a stable id and a fully
//! resolved source. The id is what merges duplicate edges into a single
//! graph node, so its construction rules matter:
//!
//! - registry ids are **name-only** (`registry:<name>`), which is the
//!   mechanism that folds different version constraints for one package into
//!   one node for the solver;
//! - git ids carry the normalized url, the ref (or `default`), and the
//!   in-repo subpath (`git:<url>#<ref>:<subpath>`);
//! - path ids carry the absolute resolved path (`path:<abs>`).

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use openpackage_schema::PackageDependency;

use crate::errors::{OpError, OpResult};

/// Which kind of source a dependency resolves from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The package registry
    Registry,
    /// A local directory
    Path,
    /// A git repository
    Git,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceKind::Registry => "registry",
            SourceKind::Path => "path",
            SourceKind::Git => "git",
        };
        f.write_str(s)
    }
}

/// A fully resolved package source
///
/// This is the closed variant the fetch layer dispatches on; selection is
/// purely on declaration shape, never on runtime probing.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageSource {
    /// Look the package up in the registry by name
    Registry {
        /// the package name
        name: String,
    },
    /// Use a local directory as the content root
    Path {
        /// absolute path to the directory
        path: Utf8PathBuf,
    },
    /// Clone/checkout a git repository
    Git {
        /// normalized repository url
        url: String,
        /// the ref to check out, if pinned
        reference: Option<String>,
        /// in-repo subdirectory holding the package
        subpath: Option<String>,
    },
}

impl PackageSource {
    /// Which kind of source this is
    pub fn kind(&self) -> SourceKind {
        match self {
            PackageSource::Registry { .. } => SourceKind::Registry,
            PackageSource::Path { .. } => SourceKind::Path,
            PackageSource::Git { .. } => SourceKind::Git,
        }
    }
}

/// A canonicalized dependency address
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAddress {
    /// The stable id nodes are keyed by
    pub id: String,
    /// A human-facing name
    pub display_name: String,
    /// The resolved source
    pub source: PackageSource,
}

/// Canonicalize a declaration, resolving relative paths against the
/// directory of the manifest that declared it
///
/// Total over valid declarations; the only failures are structural
/// (nameless, sourceless entries) or an unparseable git url.
pub fn address_dependency(
    decl: &PackageDependency,
    decl_dir: &Utf8Path,
) -> OpResult<SourceAddress> {
    if let Some(raw_url) = &decl.url {
        let git = normalize_git_url(raw_url)?;
        // an explicit `path` key wins over a shorthand-embedded subpath
        let subpath = decl.path.clone().or(git.subpath);
        let reference = git.reference;
        let id = format!(
            "git:{}#{}:{}",
            git.url,
            reference.as_deref().unwrap_or("default"),
            subpath.as_deref().unwrap_or("")
        );
        let display_name = decl.name.clone().unwrap_or_else(|| {
            let repo = git.url.rsplit('/').next().unwrap_or(&git.url);
            match &subpath {
                Some(sub) => {
                    let leaf = sub.rsplit('/').next().unwrap_or(sub);
                    format!("{repo}/{leaf}")
                }
                None => repo.to_owned(),
            }
        });
        return Ok(SourceAddress {
            id,
            display_name,
            source: PackageSource::Git {
                url: git.url,
                reference,
                subpath,
            },
        });
    }

    if let Some(path) = &decl.path {
        let resolved = resolve_path(decl_dir, Utf8Path::new(path));
        let display_name = decl.name.clone().unwrap_or_else(|| {
            resolved
                .file_name()
                .unwrap_or(resolved.as_str())
                .to_owned()
        });
        return Ok(SourceAddress {
            id: format!("path:{resolved}"),
            display_name,
            source: PackageSource::Path { path: resolved },
        });
    }

    if let Some(name) = &decl.name {
        return Ok(SourceAddress {
            id: format!("registry:{name}"),
            display_name: name.clone(),
            source: PackageSource::Registry { name: name.clone() },
        });
    }

    Err(OpError::InvalidDependency {
        name: decl.display_name(),
        reason: "entry has neither a name, a url, nor a path".to_owned(),
    })
}

/// A git url taken apart and normalized
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedGitUrl {
    /// canonical `scheme://host/owner/repo` form, lowercased host, no
    /// trailing `.git`
    pub url: String,
    /// ref split off an embedded `#ref`
    pub reference: Option<String>,
    /// subpath embedded in a `gh@owner/repo/sub/path` shorthand
    pub subpath: Option<String>,
}

/// Normalize a git url (or `gh@` shorthand), splitting off `#ref`
pub fn normalize_git_url(raw: &str) -> OpResult<NormalizedGitUrl> {
    let (raw, reference) = match raw.split_once('#') {
        Some((url, r)) if !r.is_empty() => (url, Some(r.to_owned())),
        Some((url, _)) => (url, None),
        None => (raw, None),
    };

    // gh@owner/repo[/sub/path] shorthand
    if let Some(rest) = raw.strip_prefix("gh@") {
        let mut segments = rest.splitn(3, '/');
        let owner = segments.next().filter(|s| !s.is_empty());
        let repo = segments.next().filter(|s| !s.is_empty());
        let (Some(owner), Some(repo)) = (owner, repo) else {
            return Err(OpError::BadGitUrl {
                url: raw.to_owned(),
                details: url::ParseError::RelativeUrlWithoutBase,
            });
        };
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        let subpath = segments.next().map(|s| s.trim_matches('/').to_owned());
        return Ok(NormalizedGitUrl {
            url: format!("https://github.com/{}/{repo}", owner.to_lowercase()),
            reference,
            subpath,
        });
    }

    // scp-like `git@host:owner/repo` has no scheme; lift it to ssh://,
    // and a bare `host/owner/repo` spelling defaults to https://
    let candidate = if !raw.contains("://") && raw.contains('@') && raw.contains(':') {
        let rewritten = raw.replacen(':', "/", 1);
        format!("ssh://{rewritten}")
    } else if !raw.contains("://") {
        format!("https://{raw}")
    } else {
        raw.to_owned()
    };

    let parsed = url::Url::parse(&candidate).map_err(|details| OpError::BadGitUrl {
        url: raw.to_owned(),
        details,
    })?;
    let scheme = match parsed.scheme() {
        "git+https" => "https",
        "git+ssh" => "ssh",
        other => other,
    };
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let path = parsed.path().trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let userinfo = if parsed.username().is_empty() {
        String::new()
    } else {
        format!("{}@", parsed.username())
    };
    Ok(NormalizedGitUrl {
        url: format!("{scheme}://{userinfo}{host}{path}"),
        reference,
        subpath: None,
    })
}

/// Resolve a possibly-relative path against a base, lexically
///
/// Lexical (no filesystem access) so that addressing stays a pure function;
/// `..` and `.` components are folded out.
pub fn resolve_path(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    let joined = if path.is_absolute() {
        path.to_owned()
    } else {
        base.join(path)
    };
    let mut out = Utf8PathBuf::new();
    for component in joined.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_str()),
        }
    }
    out
}

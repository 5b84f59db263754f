//! The package manifest (`openpackage.yml`)
//!
//! The manifest is YAML with `name`, `version`, `dependencies`, and
//! `dev-dependencies`. Each dependency entry carries at most one source:
//! a git `url` (which may embed a `#ref`), a local `path`, or neither
//! (registry lookup by `name`). Older manifests used separate `git`, `ref`,
//! and `subdirectory` keys; those are migrated to the `url`/`path` form by
//! [`PackageManifest::migrate`][] and never written back out.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SortedMap;

/// An error validating or migrating a manifest
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ManifestError {
    /// A dependency set both `url` and the legacy `git` key
    #[error("dependency {name} sets both 'url' and the legacy 'git' key")]
    #[diagnostic(help("remove the 'git' key; 'url' supersedes it"))]
    UrlAndGit {
        /// The dependency's display name
        name: String,
    },

    /// A dependency set both a git `url` and claimed `path` as a local dir
    ///
    /// (When `url` is present, `path` always means an in-repo subdirectory,
    /// so this only fires for the legacy `subdirectory` + `path` combo.)
    #[error("dependency {name} sets both 'path' and the legacy 'subdirectory' key")]
    #[diagnostic(help("keep only 'path'; with 'url' present it names the in-repo subdirectory"))]
    PathAndSubdirectory {
        /// The dependency's display name
        name: String,
    },

    /// A dependency entry carried no name and no source at all
    #[error("a dependency entry has neither a name nor a source")]
    #[diagnostic(help("give the entry a 'name', a 'url', or a 'path'"))]
    EmptyDependency,
}

/// A parsed `openpackage.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct PackageManifest {
    /// Name of the package
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Version of the package
    ///
    /// This is a String and not a semver::Version because registries have
    /// historically accepted loosely-versioned packages; the solver is where
    /// strictness lives.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// A brief description of the package
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Runtime dependencies
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<PackageDependency>,
    /// Dev dependencies (resolved for the root manifest only, never
    /// transitively)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dev_dependencies: Vec<PackageDependency>,
    /// Root constraint overrides: package name → range
    ///
    /// Only honored in the workspace root manifest. An override *replaces*
    /// every constraint descendants declare for that package, rather than
    /// intersecting with them.
    #[serde(default)]
    #[serde(skip_serializing_if = "SortedMap::is_empty")]
    pub overrides: SortedMap<String, String>,
}

/// One dependency entry in a manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct PackageDependency {
    /// Name of the dependency (required for registry deps, optional
    /// otherwise)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// A semver constraint string (`^1.0`, `1.2.3`, `*`, ...)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// A git URL, optionally with an embedded `#ref`
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// A path: local directory when `url` is absent, in-repo subdirectory
    /// when `url` is present
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Legacy: git URL (now `url`)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,
    /// Legacy: git ref (now embedded in `url` as `#ref`)
    #[serde(default, rename = "ref")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Legacy: in-repo subdirectory (now `path`)
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdirectory: Option<String>,
}

impl PackageDependency {
    /// A human-facing name for this dependency, for error messages
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            name.clone()
        } else if let Some(url) = &self.url {
            url.clone()
        } else if let Some(git) = &self.git {
            git.clone()
        } else if let Some(path) = &self.path {
            path.clone()
        } else {
            "<unnamed>".to_owned()
        }
    }

    /// Whether this entry still carries any legacy keys
    pub fn has_legacy_keys(&self) -> bool {
        self.git.is_some() || self.git_ref.is_some() || self.subdirectory.is_some()
    }

    /// Migrate legacy keys (`git`, `ref`, `subdirectory`) into the current
    /// `url`/`path` form.
    ///
    /// Lossless: the embedded-`#ref` form carries exactly the information the
    /// separate keys did. `url` + `git` together is a validation error rather
    /// than a silent pick.
    pub fn migrate(&mut self) -> Result<(), ManifestError> {
        if self.name.is_none()
            && self.url.is_none()
            && self.git.is_none()
            && self.path.is_none()
        {
            return Err(ManifestError::EmptyDependency);
        }
        if let Some(git) = self.git.take() {
            if self.url.is_some() {
                // un-take so the caller sees the original entry intact
                self.git = Some(git);
                return Err(ManifestError::UrlAndGit {
                    name: self.display_name(),
                });
            }
            let url = match self.git_ref.take() {
                // an embedded ref in the legacy key itself wins
                Some(_) if git.contains('#') => git,
                Some(r) => format!("{git}#{r}"),
                None => git,
            };
            self.url = Some(url);
        }
        // a stray legacy ref with a modern url gets folded in too
        if let Some(r) = self.git_ref.take() {
            if let Some(url) = &self.url {
                if !url.contains('#') {
                    self.url = Some(format!("{url}#{r}"));
                }
            }
        }
        if let Some(subdir) = self.subdirectory.take() {
            if self.path.is_some() {
                self.subdirectory = Some(subdir);
                return Err(ManifestError::PathAndSubdirectory {
                    name: self.display_name(),
                });
            }
            self.path = Some(subdir);
        }
        Ok(())
    }
}

impl PackageManifest {
    /// Migrate every dependency entry's legacy keys to the current form.
    ///
    /// Returns whether anything changed, so callers can decide whether a
    /// write-back is worth doing.
    pub fn migrate(&mut self) -> Result<bool, ManifestError> {
        let mut changed = false;
        for dep in self
            .dependencies
            .iter_mut()
            .chain(self.dev_dependencies.iter_mut())
        {
            if dep.has_legacy_keys() {
                dep.migrate()?;
                changed = true;
            } else {
                dep.migrate()?;
            }
        }
        Ok(changed)
    }
}

//! The on-disk workspace index
//!
//! A single YAML file at `<workspace>/.openpackage/openpackage.index.yml`
//! recording which packages are installed, at which versions, which packages
//! they depend on, and which workspace files each of their source files
//! produced. File ownership checks during install are answered from this
//! record.

use serde::{Deserialize, Serialize};

use crate::SortedMap;

/// The root of the workspace index file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexFile {
    /// Every installed package, keyed by package name
    #[serde(default)]
    pub packages: SortedMap<String, IndexPackage>,
}

/// The index record for one installed package
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexPackage {
    /// Where the package came from (registry name, git url, or local path)
    ///
    /// Older indexes wrote this under a `git:` key for git sources; the
    /// alias migrates them on read, and only `path:` is ever written back.
    #[serde(default, alias = "git")]
    pub path: String,
    /// The resolved version it was installed at
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Names of the packages this one depends on
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Source file → workspace files it produced
    ///
    /// Keys are package-relative source paths; the values are the workspace
    /// paths the install wrote. A single source may fan out to several
    /// targets (one per platform layout).
    #[serde(default)]
    pub files: SortedMap<String, Vec<IndexTarget>>,
}

/// One workspace file owned by a package
///
/// Plain string form for ordinary writes; the expanded form records that the
/// target was produced by merging into a shared file rather than owning it
/// outright.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IndexTarget {
    /// The target file is wholly owned by this package
    Plain(String),
    /// The target file is shared; this package merged an entry into it
    Merged {
        /// Workspace path of the shared file
        target: String,
        /// Whether the write was a merge (always true in this form)
        merge: bool,
    },
}

impl IndexTarget {
    /// The workspace path this target refers to
    pub fn target_path(&self) -> &str {
        match self {
            IndexTarget::Plain(path) => path,
            IndexTarget::Merged { target, .. } => target,
        }
    }

    /// Whether this target was a merge into a shared file
    pub fn is_merge(&self) -> bool {
        matches!(self, IndexTarget::Merged { .. })
    }
}

impl IndexFile {
    /// Look up which package owns a workspace path, if any
    pub fn owner_of(&self, target_path: &str) -> Option<&str> {
        for (name, package) in &self.packages {
            for targets in package.files.values() {
                for target in targets {
                    if target.target_path() == target_path {
                        return Some(name);
                    }
                }
            }
        }
        None
    }

    /// All workspace paths recorded for one package
    pub fn files_of(&self, package: &str) -> Vec<&str> {
        let Some(package) = self.packages.get(package) else {
            return Vec::new();
        };
        package
            .files
            .values()
            .flatten()
            .map(IndexTarget::target_path)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_targets_roundtrip() {
        let yaml = r#"
packages:
  reviewer:
    path: "registry:reviewer"
    version: 1.2.0
    files:
      agents/reviewer.md:
        - .claude/agents/reviewer.md
        - target: AGENTS.md
          merge: true
"#;
        let index: IndexFile = serde_yml::from_str(yaml).unwrap();
        let package = &index.packages["reviewer"];
        let targets = &package.files["agents/reviewer.md"];
        assert_eq!(targets[0], IndexTarget::Plain(".claude/agents/reviewer.md".into()));
        assert!(targets[1].is_merge());
        assert_eq!(targets[1].target_path(), "AGENTS.md");

        let out = serde_yml::to_string(&index).unwrap();
        let reread: IndexFile = serde_yml::from_str(&out).unwrap();
        assert_eq!(index, reread);
    }

    #[test]
    fn owner_lookup() {
        let mut index = IndexFile::default();
        let mut package = IndexPackage {
            path: "registry:reviewer".into(),
            ..Default::default()
        };
        package.files.insert(
            "agents/reviewer.md".into(),
            vec![IndexTarget::Plain(".claude/agents/reviewer.md".into())],
        );
        index.packages.insert("reviewer".into(), package);

        assert_eq!(index.owner_of(".claude/agents/reviewer.md"), Some("reviewer"));
        assert_eq!(index.owner_of(".claude/agents/other.md"), None);
        assert_eq!(index.files_of("reviewer"), vec![".claude/agents/reviewer.md"]);
    }
}

#![deny(missing_docs)]

//! Shared knowledge about agent-tooling package layouts, used by the
//! openpackage install core.
//!
//! This crate answers "what kind of package is this?": a registry of known
//! platform layouts ([`platforms`][]), a frontmatter codec
//! ([`frontmatter`][]), a content-root scanner ([`scan`][]), and a two-tier
//! format detector ([`detect`][]).

use camino::Utf8PathBuf;

pub mod detect;
pub mod errors;
pub mod flows;
pub mod frontmatter;
pub mod platforms;
pub mod scan;

pub use errors::{ProjectError, ProjectResult};

/// Parsed frontmatter: an ordered map of field name → value
pub type Frontmatter = serde_json::Map<String, serde_json::Value>;

/// One file of a package's content root
#[derive(Debug, Clone, PartialEq)]
pub struct PackageFile {
    /// Path relative to the content root
    pub rel_path: Utf8PathBuf,
    /// The raw file contents
    pub content: String,
    /// Parsed YAML frontmatter, for markdown-family files that carry one
    pub frontmatter: Option<Frontmatter>,
}

impl PackageFile {
    /// Make a file with no frontmatter
    pub fn new(rel_path: impl Into<Utf8PathBuf>, content: impl Into<String>) -> Self {
        PackageFile {
            rel_path: rel_path.into(),
            content: content.into(),
            frontmatter: None,
        }
    }

    /// Make a file, parsing frontmatter out of the contents if present
    pub fn parse(
        rel_path: impl Into<Utf8PathBuf>,
        content: impl Into<String>,
    ) -> ProjectResult<Self> {
        let rel_path = rel_path.into();
        let content = content.into();
        let frontmatter = frontmatter::parse_frontmatter(&content)
            .map_err(|details| ProjectError::Frontmatter {
                path: rel_path.clone(),
                details,
            })?;
        Ok(PackageFile {
            rel_path,
            content,
            frontmatter,
        })
    }

    /// The file body with any frontmatter fence stripped
    pub fn body(&self) -> &str {
        frontmatter::body_of(&self.content)
    }

    /// Re-render the file from its (possibly rewritten) frontmatter and body
    pub fn render(&self) -> ProjectResult<String> {
        match &self.frontmatter {
            Some(fm) => frontmatter::render_frontmatter(fm, self.body()).map_err(|details| {
                ProjectError::Frontmatter {
                    path: self.rel_path.clone(),
                    details,
                }
            }),
            None => Ok(self.content.clone()),
        }
    }
}

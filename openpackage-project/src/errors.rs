//! Errors!

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// A Result returned by openpackage-project
pub type ProjectResult<T> = std::result::Result<T, ProjectError>;

/// An Error/Diagnostic returned by openpackage-project
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ProjectError {
    /// An i/o error while scanning a content root
    #[error("couldn't scan package files in {dir}")]
    Scan {
        /// path to the dir we were scanning
        dir: Utf8PathBuf,
        /// underlying error
        #[source]
        details: std::io::Error,
    },

    /// A file's path wasn't valid UTF-8
    #[error("package file path isn't valid UTF-8: {path}")]
    #[diagnostic(help("openpackage requires UTF-8 file paths"))]
    NonUtf8Path {
        /// the lossy rendering of the path
        path: String,
    },

    /// A file's frontmatter fence contained YAML we couldn't parse
    #[error("couldn't parse frontmatter of {path}")]
    Frontmatter {
        /// path of the file
        path: Utf8PathBuf,
        /// underlying error
        #[source]
        details: serde_yml::Error,
    },

    /// A platform id that isn't in the registry
    #[error("{id} is not a recognized platform")]
    #[diagnostic(help("recognized platforms: claude, cursor, opencode, windsurf"))]
    UnknownPlatform {
        /// the id we were given
        id: String,
    },
}

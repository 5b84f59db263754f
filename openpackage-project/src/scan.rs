//! Scanning a content root into package files
//!
//! This is the directory-walk contract the install core consumes: give it a
//! content root, get back every file as a [`PackageFile`][] with a relative
//! UTF-8 path and (for markdown-family files) parsed frontmatter. Entries
//! are returned sorted by path so everything downstream is deterministic.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::{frontmatter, PackageFile, ProjectError, ProjectResult};

/// Directories that are never part of a package's payload
const SKIPPED_DIRS: &[&str] = &[".git", ".openpackage", "node_modules", "target"];

/// File extensions we parse frontmatter out of
const FRONTMATTER_EXTS: &[&str] = &["md", "mdc", "markdown"];

/// Walk a content root into package files
///
/// Binary (non-UTF-8) files are skipped with a debug log; a package registry
/// for text artifacts has no use for them and failing the whole scan over a
/// stray image would be worse.
pub fn scan_package(root: &Utf8Path) -> ProjectResult<Vec<PackageFile>> {
    let mut files = Vec::new();
    walk(root, root, &mut files)?;
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

fn walk(root: &Utf8Path, dir: &Utf8Path, files: &mut Vec<PackageFile>) -> ProjectResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|details| ProjectError::Scan {
        dir: dir.to_owned(),
        details,
    })?;
    for entry in entries {
        let entry = entry.map_err(|details| ProjectError::Scan {
            dir: dir.to_owned(),
            details,
        })?;
        let path = Utf8PathBuf::from_path_buf(entry.path()).map_err(|p| {
            ProjectError::NonUtf8Path {
                path: p.to_string_lossy().into_owned(),
            }
        })?;
        let file_type = entry.file_type().map_err(|details| ProjectError::Scan {
            dir: dir.to_owned(),
            details,
        })?;
        if file_type.is_dir() {
            let name = path.file_name().unwrap_or_default();
            if SKIPPED_DIRS.contains(&name) {
                continue;
            }
            walk(root, &path, files)?;
        } else if file_type.is_file() {
            let rel_path = path
                .strip_prefix(root)
                .expect("walked file wasn't under its own root")
                .to_owned();
            let Ok(content) = std::fs::read_to_string(&path) else {
                debug!("skipping non-text file {rel_path}");
                continue;
            };
            files.push(load_file(rel_path, content)?);
        }
    }
    Ok(())
}

/// Build a [`PackageFile`][] from a relative path and contents, parsing
/// frontmatter when the extension calls for it
pub fn load_file(rel_path: Utf8PathBuf, content: String) -> ProjectResult<PackageFile> {
    let wants_frontmatter = rel_path
        .extension()
        .map(|ext| FRONTMATTER_EXTS.contains(&ext))
        .unwrap_or(false);
    if wants_frontmatter {
        PackageFile::parse(rel_path, content)
    } else {
        Ok(PackageFile::new(rel_path, content))
    }
}

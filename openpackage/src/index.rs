//! Workspace index I/O
//!
//! The index lives at `<workspace>/.openpackage/openpackage.index.yml` and
//! is the persistent record of what's installed and who owns which file.
//! The read contract never fails on absence (a fresh workspace has no
//! index); the write contract is atomic. Nothing below the wave installer
//! writes this file directly; mutations queue through the
//! [`IndexWriteCollector`][crate::installer::IndexWriteCollector] and flush
//! under the wave barrier.

use camino::{Utf8Path, Utf8PathBuf};
use openpackage_schema::{IndexFile, INDEX_FILE_NAME, WORKSPACE_STATE_DIR};
use tracing::debug;

use crate::errors::{OpError, OpResult};
use crate::fsutil::atomic_write;

/// The index plus where it came from
#[derive(Debug, Clone)]
pub struct WorkspaceIndex {
    /// Where the index is (or will be) persisted
    pub path: Utf8PathBuf,
    /// The parsed record
    pub index: IndexFile,
    /// Read-time warnings (absence, recovered oddities)
    pub warnings: Vec<String>,
}

/// Where a workspace keeps its index
pub fn index_path(workspace: &Utf8Path) -> Utf8PathBuf {
    workspace.join(WORKSPACE_STATE_DIR).join(INDEX_FILE_NAME)
}

/// Read a workspace's index
///
/// A missing file is a warning, not an error; every package map is
/// guaranteed present (serde defaults cover omitted `files` maps).
pub fn read_index(workspace: &Utf8Path) -> OpResult<WorkspaceIndex> {
    let path = index_path(workspace);
    if !path.as_std_path().is_file() {
        debug!("no workspace index at {path}, starting empty");
        return Ok(WorkspaceIndex {
            path,
            index: IndexFile::default(),
            warnings: vec!["no workspace index found; treating the workspace as empty".to_owned()],
        });
    }
    let raw = std::fs::read_to_string(&path)?;
    let index: IndexFile =
        serde_yml::from_str(&raw).map_err(|details| OpError::IndexParse {
            path: path.clone(),
            details,
        })?;
    Ok(WorkspaceIndex {
        path,
        index,
        warnings: Vec::new(),
    })
}

/// Atomically persist an index
pub fn write_index(index: &WorkspaceIndex) -> OpResult<()> {
    let rendered = serde_yml::to_string(&index.index).map_err(|details| OpError::IndexParse {
        path: index.path.clone(),
        details,
    })?;
    atomic_write(&index.path, &rendered)
}

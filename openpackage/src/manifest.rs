//! Manifest I/O
//!
//! Reading always migrates legacy keys (`git`/`ref`/`subdirectory`) to the
//! current `url`/`path` form, so the rest of the core never sees them.
//! Writing is atomic and emits only the current form; read → write → read
//! is a fixed point once the first migration has happened.

use camino::{Utf8Path, Utf8PathBuf};
use openpackage_schema::{PackageManifest, MANIFEST_FILE_NAME};
use tracing::debug;

use crate::errors::{OpError, OpResult};
use crate::fsutil::atomic_write;

/// The manifest path inside a package or workspace dir
pub fn manifest_path(dir: &Utf8Path) -> Utf8PathBuf {
    dir.join(MANIFEST_FILE_NAME)
}

/// Read a directory's manifest, if it has one
///
/// `Ok(None)` for manifest-less directories: a bare content root is a valid
/// leaf package with no dependencies.
pub fn read_manifest(dir: &Utf8Path) -> OpResult<Option<PackageManifest>> {
    let path = manifest_path(dir);
    if !path.as_std_path().is_file() {
        return Ok(None);
    }
    Ok(Some(load_manifest(&path)?))
}

/// Load and migrate a manifest file
pub fn load_manifest(path: &Utf8Path) -> OpResult<PackageManifest> {
    let raw = std::fs::read_to_string(path)?;
    let mut manifest: PackageManifest =
        serde_yml::from_str(&raw).map_err(|details| OpError::ManifestParse {
            path: path.to_owned(),
            details,
        })?;
    if manifest.migrate()? {
        debug!("migrated legacy dependency keys in {path}");
    }
    Ok(manifest)
}

/// Atomically write a manifest
pub fn write_manifest(path: &Utf8Path, manifest: &PackageManifest) -> OpResult<()> {
    let rendered = serde_yml::to_string(manifest).map_err(|details| OpError::ManifestParse {
        path: path.to_owned(),
        details,
    })?;
    atomic_write(path, &rendered)
}

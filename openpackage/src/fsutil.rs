//! Small filesystem helpers
//!
//! Everything that persists (manifest, workspace index, installed files)
//! goes through [`atomic_write`][]: write to a sibling temp file, then
//! rename over the target, creating parent directories on the way. A
//! half-written index is worse than a stale one.

use camino::Utf8Path;

use crate::errors::OpResult;

/// Atomically write a file (write-then-rename), creating parent dirs
pub fn atomic_write(path: &Utf8Path, contents: &str) -> OpResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension(format!(
        "{}.tmp",
        path.extension().unwrap_or_default()
    ));
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Plain write with parent-dir creation, for files that don't need the
/// rename dance
pub fn write_file(path: &Utf8Path, contents: &str) -> OpResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Append to a file (creating it and its parents), used for merge targets
pub fn append_file(path: &Utf8Path, contents: &str) -> OpResult<()> {
    use std::io::Write;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

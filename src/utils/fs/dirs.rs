//! Directory creation and removal helpers.

use crate::core::UpdateError;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Create `path` and its parents unless it already exists as a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}


/// Remove a directory tree if it exists.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).context(UpdateError::io_transfer("delete directory", path))?;
    }
    Ok(())
}

/// Every entry below `dir`, excluding `dir` itself.
pub fn list_entries(dir: &Path) -> Result<BTreeSet<PathBuf>> {
    WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            entry
                .map(walkdir::DirEntry::into_path)
                .context(UpdateError::io_transfer("list directory", dir))
        })
        .collect()
}

/// Remove every entry below `dir` that is not in `keep`.
///
/// `keep` is normally an earlier [`list_entries`] of the same directory, so this undoes
/// whatever was added since.
pub fn remove_entries_except(dir: &Path, keep: &BTreeSet<PathBuf>) -> Result<()> {
    // Parents sort before their children, so an added directory goes with its subtree.
    for path in list_entries(dir)?.difference(keep) {
        let Ok(metadata) = fs::symlink_metadata(path) else {
            continue;
        };
        if metadata.is_dir() {
            fs::remove_dir_all(path).context(UpdateError::io_transfer("delete directory", path))?;
        } else {
            fs::remove_file(path).context(UpdateError::io_transfer("delete file", path))?;
        }
    }
    Ok(())
}

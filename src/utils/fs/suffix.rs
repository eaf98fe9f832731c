//! Suffix-based staging primitives for install directories.
//!
//! An update never copies the previous version aside. Instead every entry of the install
//! directory is renamed in place by appending a marker suffix, the new version is
//! extracted next to the marked originals, and the marked entries are then either deleted
//! (commit) or renamed back (rollback). The four operations here are the building blocks
//! for that sequence; [`crate::upgrade::backup::StagedBackup`] sequences them.
//!
//! # Ignore list
//!
//! Entries whose name is in the [`IgnoredDirectories`] set are matched by exact name at
//! every level and are opaque: they are never renamed, deleted or traversed.
//!
//! # Failure policy
//!
//! The first rename or delete that fails aborts the operation with an
//! [`UpdateError::IoTransfer`] carrying the failing path. Nothing is retried and nothing is
//! undone here; compensating actions are the caller's job.

use crate::core::UpdateError;
use crate::models::IgnoredDirectories;
use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// How far below the starting directory an operation reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// Only the direct children of the directory.
    TopLevel,
    /// The whole tree.
    #[default]
    Recursive,
}

struct Entry {
    path: PathBuf,
    name: OsString,
    is_dir: bool,
}

fn read_entries(dir: &Path) -> Result<Vec<Entry>> {
    let reader = fs::read_dir(dir).context(UpdateError::io_transfer("read directory", dir))?;

    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry.context(UpdateError::io_transfer("read directory", dir))?;
        // file_type() does not follow symlinks, so a link to a directory is handled as a file
        let file_type =
            entry.file_type().context(UpdateError::io_transfer("inspect", entry.path()))?;
        entries.push(Entry {
            path: entry.path(),
            name: entry.file_name(),
            is_dir: file_type.is_dir(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn strip_suffix(name: &OsStr, suffix: &str) -> Option<OsString> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};
        name.as_bytes()
            .strip_suffix(suffix.as_bytes())
            .map(|stem| OsString::from_vec(stem.to_vec()))
    }
    #[cfg(not(unix))]
    {
        name.to_str().and_then(|s| s.strip_suffix(suffix)).map(OsString::from)
    }
}

/// Whether an entry name ends with `suffix`.
#[must_use]
pub fn has_suffix(name: &OsStr, suffix: &str) -> bool {
    strip_suffix(name, suffix).is_some()
}

fn is_ignored(name: &OsStr, ignored: &IgnoredDirectories) -> bool {
    name.to_str().is_some_and(|name| ignored.contains(name))
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    trace!("Renaming {} -> {}", from.display(), to.display());
    fs::rename(from, to).context(UpdateError::io_transfer("rename", from))
}

fn delete(entry: &Entry) -> Result<()> {
    trace!("Deleting {}", entry.path.display());
    if entry.is_dir {
        fs::remove_dir_all(&entry.path)
            .context(UpdateError::io_transfer("delete directory", &entry.path))
    } else {
        fs::remove_file(&entry.path).context(UpdateError::io_transfer("delete", &entry.path))
    }
}

/// Append `suffix` to the name of every entry under `dir`.
///
/// Ignored entries are skipped together with everything beneath them. With
/// [`Depth::Recursive`] each directory is renamed first and then descended into, so every
/// returned path is the final location of a renamed entry.
///
/// # Errors
///
/// [`UpdateError::IoTransfer`] for the first entry that cannot be read or renamed.
pub fn add_suffix_to_all(
    dir: &Path,
    suffix: &str,
    depth: Depth,
    ignored: &IgnoredDirectories,
) -> Result<Vec<PathBuf>> {
    let mut renamed = Vec::new();
    add_suffix_inner(dir, suffix, depth, ignored, &mut renamed)?;
    debug!("Added suffix '{}' to {} entries under {}", suffix, renamed.len(), dir.display());
    Ok(renamed)
}

fn add_suffix_inner(
    dir: &Path,
    suffix: &str,
    depth: Depth,
    ignored: &IgnoredDirectories,
    renamed: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry in read_entries(dir)? {
        if is_ignored(&entry.name, ignored) {
            debug!("Leaving ignored entry {} untouched", entry.path.display());
            continue;
        }

        let mut new_name = entry.name.clone();
        new_name.push(suffix);
        let target = entry.path.with_file_name(new_name);
        rename(&entry.path, &target)?;
        renamed.push(target.clone());

        if entry.is_dir && depth == Depth::Recursive {
            add_suffix_inner(&target, suffix, depth, ignored, renamed)?;
        }
    }
    Ok(())
}

/// Strip `suffix` from every entry under `dir` whose name ends with it.
///
/// Entries without the suffix are left alone, so running this twice is harmless.
/// Ignored entries keep their name even when it ends with the suffix.
/// Restoring onto a name that is already taken fails instead of overwriting.
///
/// # Errors
///
/// [`UpdateError::IoTransfer`] for the first entry that cannot be read or renamed.
pub fn remove_suffix_from_all(
    dir: &Path,
    suffix: &str,
    depth: Depth,
    ignored: &IgnoredDirectories,
) -> Result<Vec<PathBuf>> {
    let mut restored = Vec::new();
    remove_suffix_inner(dir, suffix, depth, ignored, &mut restored)?;
    debug!("Removed suffix '{}' from {} entries under {}", suffix, restored.len(), dir.display());
    Ok(restored)
}

fn remove_suffix_inner(
    dir: &Path,
    suffix: &str,
    depth: Depth,
    ignored: &IgnoredDirectories,
    restored: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry in read_entries(dir)? {
        if is_ignored(&entry.name, ignored) {
            continue;
        }

        let current = match strip_suffix(&entry.name, suffix) {
            Some(original) if !original.is_empty() => {
                let target = entry.path.with_file_name(original);
                if fs::symlink_metadata(&target).is_ok() {
                    return Err(anyhow::anyhow!("'{}' already exists", target.display())
                        .context(UpdateError::io_transfer("restore", &entry.path)));
                }
                rename(&entry.path, &target)?;
                restored.push(target.clone());
                target
            }
            _ => entry.path.clone(),
        };

        if entry.is_dir && depth == Depth::Recursive {
            remove_suffix_inner(&current, suffix, depth, ignored, restored)?;
        }
    }
    Ok(())
}

/// Delete every entry under `dir` whose name ends with `suffix`.
///
/// A matching directory is removed with its whole subtree and not descended into.
/// Ignored entries are skipped even when their name ends with the suffix.
///
/// # Errors
///
/// [`UpdateError::IoTransfer`] for the first entry that cannot be read or deleted.
pub fn delete_all_with_suffix(
    dir: &Path,
    suffix: &str,
    depth: Depth,
    ignored: &IgnoredDirectories,
) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    delete_matching(dir, depth, ignored, &mut deleted, &|name| has_suffix(name, suffix))?;
    debug!("Deleted {} entries ending with '{}' under {}", deleted.len(), suffix, dir.display());
    Ok(deleted)
}

/// Delete every entry under `dir` whose name does not end with `suffix`.
///
/// Ignored entries are skipped and a deleted directory is not descended into.
///
/// # Errors
///
/// [`UpdateError::IoTransfer`] for the first entry that cannot be read or deleted.
pub fn delete_all_without_suffix(
    dir: &Path,
    suffix: &str,
    depth: Depth,
    ignored: &IgnoredDirectories,
) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    delete_matching(dir, depth, ignored, &mut deleted, &|name| !has_suffix(name, suffix))?;
    debug!("Deleted {} entries without '{}' under {}", deleted.len(), suffix, dir.display());
    Ok(deleted)
}

fn delete_matching(
    dir: &Path,
    depth: Depth,
    ignored: &IgnoredDirectories,
    deleted: &mut Vec<PathBuf>,
    matches: &dyn Fn(&OsStr) -> bool,
) -> Result<()> {
    for entry in read_entries(dir)? {
        if is_ignored(&entry.name, ignored) {
            continue;
        }

        if matches(&entry.name) {
            delete(&entry)?;
            deleted.push(entry.path);
        } else if entry.is_dir && depth == Depth::Recursive {
            delete_matching(&entry.path, depth, ignored, deleted, matches)?;
        }
    }
    Ok(())
}

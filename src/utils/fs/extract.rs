//! Zip package extraction into an install directory.

use crate::core::UpdateError;
use crate::models::IgnoredDirectories;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// Extract every entry of the zip archive at `archive` into `target`.
///
/// Entries are written next to whatever already sits in `target` and never replace an
/// existing file. Entries whose first path component is in `ignored` are skipped, so the
/// contents of ignored directories cannot be overwritten by a package. Returns the number
/// of files written.
///
/// # Errors
///
/// [`UpdateError::IoTransfer`] when the archive cannot be opened, an entry name escapes
/// the target directory, an entry is corrupt or a file cannot be written. Entries extracted
/// before the failure are left in place for the caller to clean up.
pub fn extract_zip(archive: &Path, target: &Path, ignored: &IgnoredDirectories) -> Result<usize> {
    let file = File::open(archive).context(UpdateError::io_transfer("open archive", archive))?;
    let mut zip =
        zip::ZipArchive::new(file).context(UpdateError::io_transfer("read archive", archive))?;

    debug!("Extracting {} entries from {} into {}", zip.len(), archive.display(), target.display());

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .context(UpdateError::io_transfer("read archive entry", archive))?;

        let relative: PathBuf = entry
            .enclosed_name()
            .ok_or_else(|| anyhow::anyhow!("entry '{}' escapes the target directory", entry.name()))
            .context(UpdateError::io_transfer("extract", archive))?;

        if is_under_ignored(&relative, ignored) {
            debug!("Skipping '{}' inside an ignored directory", relative.display());
            continue;
        }

        let destination = target.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&destination)
                .context(UpdateError::io_transfer("create directory", &destination))?;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .context(UpdateError::io_transfer("create directory", parent))?;
        }

        trace!("Writing {}", destination.display());
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
            .context(UpdateError::io_transfer("extract", &destination))?;
        io::copy(&mut entry, &mut out).context(UpdateError::io_transfer("extract", &destination))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&destination, fs::Permissions::from_mode(mode))
                .context(UpdateError::io_transfer("set permissions on", &destination))?;
        }

        written += 1;
    }

    debug!("Extracted {} files into {}", written, target.display());
    Ok(written)
}

fn is_under_ignored(relative: &Path, ignored: &IgnoredDirectories) -> bool {
    match relative.components().next() {
        Some(Component::Normal(first)) => first.to_str().is_some_and(|name| ignored.contains(name)),
        _ => false,
    }
}

use crate::models::IgnoredDirectories;
use crate::utils::fs::{
    Depth, add_suffix_to_all, delete_all_with_suffix, delete_all_without_suffix,
    remove_suffix_from_all,
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Where a [`StagedBackup`] ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Nothing decided yet.
    Pending,
    /// The originals were deleted and the new version stays.
    Committed,
    /// The new entries were deleted and the originals restored.
    RolledBack,
    /// Staging, commit or rollback itself failed; the directory needs repair.
    Failed,
}

/// In-place backup of an install directory for the duration of one update.
///
/// Instead of copying the previous version aside, every top-level entry of the target
/// directory is renamed by appending a suffix. The new version is then extracted next
/// to the renamed originals and the transaction either deletes the originals
/// ([`commit`](Self::commit)) or deletes the new entries and renames the originals back
/// ([`rollback`](Self::rollback)). Ignored entries are never touched.
///
/// Only top-level entries are renamed: suffixed names deeper in the tree belong to the
/// application and are none of the transaction's business.
///
/// A crash between [`stage`](Self::stage) and the final step leaves suffixed entries
/// behind; [`purge_stale`](Self::purge_stale) removes them at the start of the next update.
///
/// # Examples
///
/// ```rust,no_run
/// use updraft::models::IgnoredDirectories;
/// use updraft::upgrade::backup::StagedBackup;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let mut backup = StagedBackup::new(Path::new("apps/Foo"), "_UDbackup", IgnoredDirectories::none());
/// backup.purge_stale()?;
/// backup.stage()?;
///
/// let extracted: anyhow::Result<()> = Ok(()); // extract the new version here
/// match extracted {
///     Ok(()) => backup.commit()?,
///     Err(e) => return Err(backup.rollback(e)),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StagedBackup {
    target: PathBuf,
    suffix: String,
    ignored: IgnoredDirectories,
    renamed: Vec<PathBuf>,
    outcome: TransactionOutcome,
}

impl StagedBackup {
    pub fn new(target: &Path, suffix: impl Into<String>, ignored: IgnoredDirectories) -> Self {
        Self {
            target: target.to_path_buf(),
            suffix: suffix.into(),
            ignored,
            renamed: Vec::new(),
            outcome: TransactionOutcome::Pending,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn outcome(&self) -> TransactionOutcome {
        self.outcome
    }

    /// Backup entries created by [`stage`](Self::stage).
    pub fn renamed(&self) -> &[PathBuf] {
        &self.renamed
    }

    /// Delete suffixed entries left behind by an interrupted earlier update.
    pub fn purge_stale(&self) -> Result<Vec<PathBuf>> {
        let stale =
            delete_all_with_suffix(&self.target, &self.suffix, Depth::TopLevel, &self.ignored)?;
        if !stale.is_empty() {
            warn!(
                "Removed {} leftover backup entries from {}",
                stale.len(),
                self.target.display()
            );
        }
        Ok(stale)
    }

    /// Rename every non-ignored top-level entry by appending the suffix.
    ///
    /// When a rename fails, the entries renamed so far are renamed back before the error
    /// is returned, so a failed stage leaves the directory as it was.
    pub fn stage(&mut self) -> Result<usize> {
        match add_suffix_to_all(&self.target, &self.suffix, Depth::TopLevel, &self.ignored) {
            Ok(renamed) => {
                info!("Backed up {} entries in {}", renamed.len(), self.target.display());
                self.renamed = renamed;
                Ok(self.renamed.len())
            }
            Err(e) => {
                warn!("Backup of {} failed, restoring renamed entries", self.target.display());
                Err(self.restore_after(e))
            }
        }
    }

    /// Delete the backed up originals, keeping the new version.
    pub fn commit(&mut self) -> Result<()> {
        match delete_all_with_suffix(&self.target, &self.suffix, Depth::TopLevel, &self.ignored) {
            Ok(deleted) => {
                debug!(
                    "Committed update of {} ({} originals removed)",
                    self.target.display(),
                    deleted.len()
                );
                self.outcome = TransactionOutcome::Committed;
                Ok(())
            }
            Err(e) => {
                self.outcome = TransactionOutcome::Failed;
                Err(e)
            }
        }
    }

    /// Undo a failed extraction and hand back `cause`.
    ///
    /// New entries are deleted and the originals renamed back. If that itself fails, the
    /// returned error still carries `cause`, with the rollback failure described on top.
    pub fn rollback(&mut self, cause: anyhow::Error) -> anyhow::Error {
        warn!("Rolling back update of {}", self.target.display());
        let restored =
            delete_all_without_suffix(&self.target, &self.suffix, Depth::TopLevel, &self.ignored)
                .map(|_| ());
        match restored {
            Ok(()) => self.restore_after(cause),
            Err(rollback_error) => self.fail(cause, &rollback_error),
        }
    }

    fn restore_after(&mut self, cause: anyhow::Error) -> anyhow::Error {
        match remove_suffix_from_all(&self.target, &self.suffix, Depth::TopLevel, &self.ignored) {
            Ok(restored) => {
                info!("Restored {} entries in {}", restored.len(), self.target.display());
                self.outcome = TransactionOutcome::RolledBack;
                cause
            }
            Err(rollback_error) => self.fail(cause, &rollback_error),
        }
    }

    fn fail(&mut self, cause: anyhow::Error, rollback_error: &anyhow::Error) -> anyhow::Error {
        error!("Could not restore {}: {:#}", self.target.display(), rollback_error);
        self.outcome = TransactionOutcome::Failed;
        cause.context(format!(
            "Restoring '{}' failed as well, entries ending with '{}' hold the previous version: {:#}",
            self.target.display(),
            self.suffix,
            rollback_error
        ))
    }
}

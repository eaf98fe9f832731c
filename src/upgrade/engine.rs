//! Install and update flows for one application directory.
//!
//! ```text
//! install:  create dir ─ clear temp ─ download+verify ─ extract ──────────────── clear temp
//!                                                          └─ failed: delete new ┘
//!
//! update:   create dir ─ clear temp ─ purge stale backups ─ download+verify ─ stage backup
//!           ─ extract ─┬─ ok:     delete backups (commit) ─┬─ clear temp
//!                      └─ failed: delete new, restore ─────┘
//! ```
//!
//! Nothing in the application directory changes before the archive has been downloaded
//! and verified. The temp directory is cleared on every exit path. Steps run strictly in
//! this order; filesystem work is synchronous.

use crate::constants::BACKUP_SUFFIX;
use crate::layout::Layout;
use crate::models::{AppDescriptor, Credentials, IgnoredDirectories};
use crate::upgrade::backup::StagedBackup;
use crate::upgrade::config::EngineConfig;
use crate::upgrade::download::{CancelToken, DownloadProgress, Downloader};
use crate::utils::fs::{extract_zip, list_entries, remove_dir_all, remove_entries_except};
use anyhow::{Context, Result};
use futures::StreamExt;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Receives progress and the final result of an engine run.
///
/// This is the engine's side of the user interface; both methods default to doing
/// nothing.
pub trait UpdateObserver: Send + Sync {
    /// Called for every chunk received while downloading.
    fn on_progress(&self, _app: &AppDescriptor, _progress: DownloadProgress) {}

    /// Called exactly once when the run is over, after all progress updates.
    fn on_complete(&self, _app: &AppDescriptor, _error: Option<&anyhow::Error>) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl UpdateObserver for NoopObserver {}

/// Runs install and update transactions under one [`Layout`].
///
/// # Examples
///
/// ```rust,no_run
/// use semver::Version;
/// use updraft::layout::Layout;
/// use updraft::models::AppDescriptor;
/// use updraft::upgrade::{EngineConfig, UpdateEngine};
///
/// # async fn example() -> anyhow::Result<()> {
/// let engine = UpdateEngine::new(Layout::new("/opt/apps"), EngineConfig::default())?;
/// let app = AppDescriptor::builder("Foo", "https://downloads.example.test/foo")
///     .installed_version(Version::new(1, 0, 0))
///     .latest_version(Version::new(1, 1, 0))
///     .build()?;
///
/// engine.update(&app, None).await?;
/// # Ok(())
/// # }
/// ```
pub struct UpdateEngine {
    layout: Layout,
    downloader: Downloader,
    config: EngineConfig,
}

impl UpdateEngine {
    pub fn new(layout: Layout, config: EngineConfig) -> Result<Self> {
        let downloader = Downloader::new(layout.clone(), &config)?;
        Ok(Self {
            layout,
            downloader,
            config,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Install the latest version of `app` into a fresh directory.
    pub async fn install(
        &self,
        app: &AppDescriptor,
        credentials: Option<&Credentials>,
    ) -> Result<PathBuf> {
        self.install_with(app, credentials, &NoopObserver, &CancelToken::new()).await
    }

    /// [`install`](Self::install) reporting to `observer` and honouring `cancel`.
    ///
    /// When extraction fails a directory created by this install is deleted entirely; a
    /// directory that already existed only loses the entries the extraction added.
    pub async fn install_with(
        &self,
        app: &AppDescriptor,
        credentials: Option<&Credentials>,
        observer: &dyn UpdateObserver,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        info!("Installing {}", app);
        let result = self
            .run_install(app, credentials, observer, cancel)
            .await
            .with_context(|| format!("Failed to install {}", app.name()));
        self.finish(app, result, observer)
    }

    /// Replace the installed version of `app` with its latest version.
    pub async fn update(
        &self,
        app: &AppDescriptor,
        credentials: Option<&Credentials>,
    ) -> Result<PathBuf> {
        self.update_with(app, credentials, &NoopObserver, &CancelToken::new()).await
    }

    /// [`update`](Self::update) reporting to `observer` and honouring `cancel`.
    ///
    /// A failed extraction is rolled back so the directory holds exactly what it held
    /// before, and the extraction error is returned.
    pub async fn update_with(
        &self,
        app: &AppDescriptor,
        credentials: Option<&Credentials>,
        observer: &dyn UpdateObserver,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        info!("Updating {}", app);
        let result = self
            .run_update(app, credentials, observer, cancel)
            .await
            .with_context(|| format!("Failed to update {}", app.name()));
        self.finish(app, result, observer)
    }

    async fn run_install(
        &self,
        app: &AppDescriptor,
        credentials: Option<&Credentials>,
        observer: &dyn UpdateObserver,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let existed = self.layout.app_dir(app).exists();
        let target = self.layout.directory(app.directory_path(), true)?;
        self.layout.delete_temp()?;

        let archive = self.download(app, credentials, observer, cancel).await?;

        let preexisting = if existed { Some(list_entries(&target)?) } else { None };
        match extract_zip(&archive, &target, &IgnoredDirectories::none()) {
            Ok(files) => {
                info!("Installed {} files into {}", files, target.display());
                Ok(target)
            }
            Err(e) => {
                discard(&target, preexisting.as_ref());
                Err(e)
            }
        }
    }

    async fn run_update(
        &self,
        app: &AppDescriptor,
        credentials: Option<&Credentials>,
        observer: &dyn UpdateObserver,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let target = self.layout.directory(app.directory_path(), true)?;
        self.layout.delete_temp()?;

        let mut backup =
            StagedBackup::new(&target, BACKUP_SUFFIX, app.ignored_directories().clone());
        backup.purge_stale()?;

        let archive = self.download(app, credentials, observer, cancel).await?;

        backup.stage()?;
        match extract_zip(&archive, &target, app.ignored_directories()) {
            Ok(files) => {
                debug!("Extracted {} files into {}", files, target.display());
                backup.commit()?;
                info!("Updated {} in {}", app, target.display());
                Ok(target)
            }
            Err(e) => Err(backup.rollback(e)),
        }
    }

    async fn download(
        &self,
        app: &AppDescriptor,
        credentials: Option<&Credentials>,
        observer: &dyn UpdateObserver,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let mut task = self.downloader.start(app, credentials, cancel.clone());
        {
            let mut progress = std::pin::pin!(task.progress());
            while let Some(update) = progress.next().await {
                observer.on_progress(app, update);
            }
        }
        task.finish().await
    }

    fn finish(
        &self,
        app: &AppDescriptor,
        result: Result<PathBuf>,
        observer: &dyn UpdateObserver,
    ) -> Result<PathBuf> {
        if let Err(e) = self.layout.delete_temp() {
            warn!("Failed to clean up temp directory: {:#}", e);
        }
        observer.on_complete(app, result.as_ref().err());
        result
    }
}

/// Best-effort removal of a partial install.
///
/// With `preexisting`, the directory was there before the install and only entries
/// outside that set are removed.
fn discard(target: &Path, preexisting: Option<&BTreeSet<PathBuf>>) {
    let result = match preexisting {
        Some(keep) => {
            warn!("Extraction failed, removing new entries from {}", target.display());
            remove_entries_except(target, keep)
        }
        None => {
            warn!("Extraction failed, removing {}", target.display());
            remove_dir_all(target)
        }
    };
    if let Err(e) = result {
        warn!("Failed to clean up {}: {:#}", target.display(), e);
    }
}

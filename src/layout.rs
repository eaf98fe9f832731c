//! Local filesystem layout of installed applications.
//!
//! Every application managed by the updater lives in its own subdirectory of a single
//! root directory, next to the updater installation and a scratch directory for downloads:
//!
//! ```text
//! <root>/
//! ├── Foo/             # one directory per application, named by its directory path
//! │   └── Foo(.exe)
//! ├── Updater/         # the updater installation
//! │   └── Updater(.exe)
//! └── Updater tmp/     # download scratch space, deleted before and after every operation
//! ```

use crate::constants::{TEMP_DIRECTORY_NAME, UPDATER_DIRECTORY_NAME, UPDATER_NAME};
use crate::core::UpdateError;
use crate::models::AppDescriptor;
use crate::utils::fs::{ensure_dir, remove_dir_all};
use anyhow::{Context, Result};
use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolves application, updater and scratch locations under one root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Derive the layout from the running executable of `current`.
    ///
    /// The executable must live in a directory named after `current`'s directory path;
    /// the root is that directory's parent.
    ///
    /// # Errors
    ///
    /// Fails when the executable path cannot be determined or the directory name does
    /// not match.
    pub fn from_current_exe(current: &AppDescriptor) -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        Self::from_executable(&exe, Some(current.directory_path()))
    }

    /// Derive the layout from an executable path.
    ///
    /// With `expected_dir`, the directory holding the executable must carry that name.
    pub fn from_executable(exe: &Path, expected_dir: Option<&str>) -> Result<Self> {
        let exe_dir = exe.parent().ok_or_else(|| {
            UpdateError::validation(format!("'{}' has no parent directory", exe.display()))
        })?;

        if let Some(expected) = expected_dir {
            let actual = exe_dir.file_name().and_then(|name| name.to_str());
            if actual != Some(expected) {
                return Err(UpdateError::validation(format!(
                    "The executable must be located in a directory named '{expected}', found '{}'",
                    exe_dir.display()
                ))
                .into());
            }
        }

        let root = exe_dir.parent().ok_or_else(|| {
            UpdateError::validation(format!(
                "'{}' has no parent to use as root directory",
                exe_dir.display()
            ))
        })?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the directory `name` under the root, optionally creating it.
    pub fn directory(&self, name: &str, create: bool) -> Result<PathBuf> {
        let path = self.root.join(name);
        if create {
            ensure_dir(&path)
                .with_context(|| format!("Failed to create directory for '{name}'"))?;
        }
        Ok(path)
    }

    /// Install directory of `app`.
    pub fn app_dir(&self, app: &AppDescriptor) -> PathBuf {
        self.root.join(app.directory_path())
    }

    /// Download scratch directory.
    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIRECTORY_NAME)
    }

    /// Remove the scratch directory and everything in it, if present.
    pub fn delete_temp(&self) -> Result<()> {
        let temp = self.temp_dir();
        if temp.exists() {
            debug!("Deleting temp directory {}", temp.display());
        }
        remove_dir_all(&temp)
    }

    pub fn updater_dir(&self) -> PathBuf {
        self.root.join(UPDATER_DIRECTORY_NAME)
    }

    /// Where the executable of `app` is expected: `<root>/<dir>/<name><EXE_SUFFIX>`.
    pub fn executable_path(&self, app: &AppDescriptor) -> PathBuf {
        self.app_dir(app).join(format!("{}{EXE_SUFFIX}", app.name()))
    }

    /// The executable of `app`, if it exists.
    pub fn executable(&self, app: &AppDescriptor) -> Option<PathBuf> {
        let path = self.executable_path(app);
        path.is_file().then_some(path)
    }

    /// The updater executable, if the updater is installed.
    pub fn updater_executable(&self) -> Option<PathBuf> {
        let path = self.updater_dir().join(format!("{UPDATER_NAME}{EXE_SUFFIX}"));
        path.is_file().then_some(path)
    }
}

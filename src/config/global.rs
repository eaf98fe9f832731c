//! Global configuration for the updater.
//!
//! The file is optional. When it is missing every field takes its default, which is what
//! most installations want: the root directory is derived from where the updater lives and
//! checksums are verified.
//!
//! # Location
//!
//! - `UPDRAFT_CONFIG` environment variable, if set
//! - Unix/macOS: `~/.updraft/config.toml`
//! - Windows: `%LOCALAPPDATA%\updraft\config.toml`
//!
//! # File Format
//!
//! ```toml
//! # Root directory holding one subdirectory per installed application
//! root = "/opt/apps"
//!
//! # Where updater packages are published
//! updater_address = "https://downloads.example.test/updater"
//!
//! [engine]
//! verify_checksum = true
//! show_progress = true
//! ```

use crate::constants::CONFIG_ENV_VAR;
use crate::core::UpdateError;
use crate::upgrade::config::EngineConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Contents of the global configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GlobalConfig {
    /// Root directory of installed applications.
    ///
    /// Overrides the directory derived from the updater executable's location.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Base address updater packages are fetched from.
    #[serde(default)]
    pub updater_address: Option<String>,

    /// Engine settings, the `[engine]` table.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl GlobalConfig {
    /// Load from the default location, falling back to defaults if there is no file.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path`, or the default location when `path` is `None`.
    ///
    /// A missing file is not an error; a file that exists but cannot be read or parsed is.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).with_context(|| UpdateError::Config {
            message: format!("Failed to parse {}", path.display()),
        })
    }

    /// Path of the configuration file.
    ///
    /// `UPDRAFT_CONFIG` wins over the platform default.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("updraft")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".updraft")
        };

        Ok(config_dir.join("config.toml"))
    }
}

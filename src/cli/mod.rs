//! Command-line interface of the updater binary.
//!
//! The updater is not meant to be started by hand. The application being updated starts
//! it with the positional handoff arguments (see [`crate::handoff::codec`]); the options
//! exist for diagnostics and for unusual layouts.
//!
//! ```text
//! updraft-updater [--verbose|--quiet] [--no-progress] [--root DIR] [--config FILE] <ARGS>...
//! ```
//!
//! # Exit Codes
//!
//! - `0`: the update succeeded
//! - `1`: anything failed, including bad arguments


use crate::config::GlobalConfig;
use crate::handoff::{ArgumentCodec, ConsoleUi, Updater};
use crate::layout::Layout;
use crate::upgrade::UpdateEngine;
use crate::utils::progress::is_progress_disabled;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Runtime settings derived from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Never draw progress bars.
    pub no_progress: bool,

    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,

    /// Explicit root directory.
    pub root: Option<PathBuf>,
}

/// The updater command line.
#[derive(Parser, Debug)]
#[command(
    name = "updraft-updater",
    about = "Applies an update handed over by an updraft application",
    version,
    long_about = "Downloads, verifies and installs a new version of an application into its \
                  directory, restoring the previous version if anything goes wrong. Started by \
                  the application itself with positional handoff arguments."
)]
pub struct Cli {
    /// Log debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Do not draw progress bars
    #[arg(long)]
    no_progress: bool,

    /// Root directory holding the installed applications
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Handoff arguments written by the application being updated
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
            root: self.root.clone(),
        }
    }

    /// Run the update described by the handoff arguments.
    ///
    /// Errors are returned for failures the user has not been told about yet: bad
    /// arguments and broken setup. A failed update has already been reported (or kept
    /// quiet on request) and only yields [`ExitCode::FAILURE`].
    pub async fn execute(self) -> Result<ExitCode> {
        let config = self.build_config();
        let request = ArgumentCodec::decode(&self.args)?;

        let global = GlobalConfig::load_with_optional(config.config_path.clone()).await?;
        let layout = resolve_layout(&config, &global)?;
        info!("Using root directory {}", layout.root().display());

        let show_progress =
            !config.no_progress && global.engine.show_progress && !is_progress_disabled();
        let engine = UpdateEngine::new(layout, global.engine)?;
        let ui = ConsoleUi::new(show_progress);

        match Updater::new(&engine, &ui).execute(request).await {
            Ok(outcome) => {
                debug!("Update finished: {:?}", outcome);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                debug!("Update failed: {:?}", e);
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// `--root`, then the configured root, then the parent of the updater's own directory.
fn resolve_layout(config: &CliConfig, global: &GlobalConfig) -> Result<Layout> {
    if let Some(root) = config.root.as_ref().or(global.root.as_ref()) {
        return Ok(Layout::new(root));
    }
    let exe = std::env::current_exe().context("Failed to locate the updater executable")?;
    Layout::from_executable(&exe, None)
}

/// Install the global tracing subscriber, logging to stderr.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

//! Caller side of the handoff: start the updater and get out of its way.
//!
//! A running application cannot replace its own files, so it encodes the update request
//! as arguments, spawns the updater as a detached process and exits. The updater never
//! reports back.

use crate::config::GlobalConfig;
use crate::constants::CRATE_VERSION;
use crate::context::AppContext;
use crate::core::UpdateError;
use crate::handoff::codec::{ArgumentCodec, HandoffRequest};
use crate::models::{AppDescriptor, Credentials, UpdaterBehavior};
use crate::upgrade::UpdateEngine;
use crate::upgrade::version_check::{format_version_info, parse_reported_version};
use anyhow::{Context, Result};
use semver::Version;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// What [`Handoff::ensure_updater`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterStatus {
    /// The updater was missing and has been installed.
    Installed,
    /// The updater reported a different version and has been updated.
    Updated,
    /// The installed updater already matches this version.
    UpToDate,
}

/// Starts updater processes on behalf of the current application.
///
/// # Examples
///
/// ```rust,no_run
/// use updraft::context::AppContext;
/// use updraft::handoff::Handoff;
/// use updraft::models::{AppDescriptor, UpdaterBehavior};
///
/// # fn example(context: &AppContext, latest: &AppDescriptor) -> anyhow::Result<()> {
/// Handoff::new(context).run(latest, UpdaterBehavior::RunAfterUpdate, None)?;
/// std::process::exit(0);
/// # }
/// ```
pub struct Handoff<'a> {
    context: &'a AppContext,
}

impl<'a> Handoff<'a> {
    pub fn new(context: &'a AppContext) -> Self {
        Self {
            context,
        }
    }

    /// Spawn the updater to bring `app` to its latest version.
    ///
    /// The arguments this process was started with are passed along, so the updater can
    /// relaunch the application the same way. Returns the updater's process id; the
    /// caller is expected to exit right away.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::UpdaterNotInstalled`] when there is no updater under the root
    /// - [`UpdateError::ReservedName`] when `app` is the updater itself
    /// - [`UpdateError::Validation`] when `app` has no latest version
    pub fn run(
        &self,
        app: &AppDescriptor,
        behavior: UpdaterBehavior,
        credentials: Option<Credentials>,
    ) -> Result<u32> {
        let relaunch_args = join_args(std::env::args_os().skip(1));
        self.run_with_args(app, behavior, credentials, relaunch_args)
    }

    /// [`run`](Self::run) with an explicit argument string to replay on relaunch.
    pub fn run_with_args(
        &self,
        app: &AppDescriptor,
        behavior: UpdaterBehavior,
        credentials: Option<Credentials>,
        relaunch_args: impl Into<String>,
    ) -> Result<u32> {
        if app.is_updater() {
            return Err(UpdateError::ReservedName {
                name: app.name().to_string(),
            }
            .into());
        }

        let updater =
            self.context.layout().updater_executable().ok_or(UpdateError::UpdaterNotInstalled)?;

        let args = ArgumentCodec::encode(&HandoffRequest {
            app: app.clone(),
            behavior,
            credentials,
            relaunch_args: relaunch_args.into(),
        })?;

        info!("Handing {} over to {}", app, updater.display());
        debug!("Updater arguments: {:?}", args);
        spawn_detached(&updater, &args)
    }

    /// Make sure the updater under the root matches this crate's version.
    ///
    /// A missing updater is installed from `address`. An installed one is asked for its
    /// version with `--version`; when it reports another version, or cannot be asked,
    /// it is updated. `engine` must work under the same root as the context.
    pub async fn ensure_updater(
        &self,
        engine: &UpdateEngine,
        address: &str,
    ) -> Result<UpdaterStatus> {
        if engine.layout().root() != self.context.layout().root() {
            return Err(UpdateError::validation(format!(
                "The engine root '{}' differs from the application root '{}'",
                engine.layout().root().display(),
                self.context.layout().root().display()
            ))
            .into());
        }
        let expected = Version::parse(CRATE_VERSION).context("Invalid crate version")?;

        let Some(executable) = engine.layout().updater_executable() else {
            info!("Updater not found under {}, installing", engine.layout().root().display());
            let updater = AppDescriptor::updater(None, Some(expected), address);
            engine.install(&updater, None).await?;
            return Ok(UpdaterStatus::Installed);
        };

        let reported = probe_version(&executable).await;
        if reported.as_ref() == Some(&expected) {
            debug!("Updater {} is up to date", expected);
            return Ok(UpdaterStatus::UpToDate);
        }

        let updater = AppDescriptor::updater(reported, Some(expected), address);
        info!("Updating {}", format_version_info(&updater));
        engine.update(&updater, None).await?;
        Ok(UpdaterStatus::Updated)
    }

    /// [`ensure_updater`](Self::ensure_updater) with the address from the global
    /// configuration's `updater_address`.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Config`] when no updater address is configured.
    pub async fn ensure_configured_updater(
        &self,
        engine: &UpdateEngine,
        config: &GlobalConfig,
    ) -> Result<UpdaterStatus> {
        let address = config.updater_address.as_deref().ok_or_else(|| UpdateError::Config {
            message: "No updater_address is configured".to_string(),
        })?;
        self.ensure_updater(engine, address).await
    }
}

/// Ask an updater executable for its version.
async fn probe_version(executable: &Path) -> Option<Version> {
    let output = match tokio::process::Command::new(executable).arg("--version").output().await {
        Ok(output) => output,
        Err(e) => {
            warn!("Failed to run {} --version: {}", executable.display(), e);
            return None;
        }
    };
    let version = parse_reported_version(&String::from_utf8_lossy(&output.stdout));
    debug!("Updater reported version {:?}", version);
    version
}

/// Join process arguments with spaces, replacing anything that is not valid Unicode.
fn join_args(args: impl IntoIterator<Item = OsString>) -> String {
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Start `program` with no inherited stdio and without waiting for it.
fn spawn_detached(program: &Path, args: &[String]) -> Result<u32> {
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }

    let child = command
        .spawn()
        .with_context(|| format!("Failed to start {}", program.display()))?;
    Ok(child.id())
}

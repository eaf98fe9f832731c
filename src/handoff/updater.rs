//! Updater side of the handoff.
//!
//! Decodes the request, runs the update transaction and then does whatever the caller
//! asked for: nothing, a success message, or relaunching the application. This is the
//! only place messages for the user are composed.

use crate::core::{UpdateError, find_update_error, format_error_chain};
use crate::handoff::codec::{ArgumentCodec, HandoffRequest};
use crate::handoff::console::UpdaterUi;
use crate::models::{AppDescriptor, UpdaterBehavior};
use crate::upgrade::{CancelToken, NoopObserver, UpdateEngine, UpdateObserver};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, error, info};

/// Result of a successful handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterOutcome {
    /// The updated application directory.
    pub directory: PathBuf,
    /// Process id of the relaunched application, for [`UpdaterBehavior::RunAfterUpdate`].
    pub relaunched: Option<u32>,
}

/// Executes handoff requests with one engine and one user interface.
pub struct Updater<'a> {
    engine: &'a UpdateEngine,
    ui: &'a dyn UpdaterUi,
}

impl<'a> Updater<'a> {
    pub fn new(engine: &'a UpdateEngine, ui: &'a dyn UpdaterUi) -> Self {
        Self {
            engine,
            ui,
        }
    }

    /// Decode `args` and execute the request.
    ///
    /// Decoding errors are returned without being shown: before decoding there is no
    /// behavior that says whether the user wants to see anything.
    pub async fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<UpdaterOutcome> {
        let request = ArgumentCodec::decode(args)?;
        self.execute(request).await
    }

    /// Update the requested application and follow up according to its behavior.
    ///
    /// Failures are shown to the user unless the behavior is
    /// [`UpdaterBehavior::Hidden`], and returned either way.
    pub async fn execute(&self, request: HandoffRequest) -> Result<UpdaterOutcome> {
        let HandoffRequest {
            app,
            behavior,
            credentials,
            relaunch_args,
        } = request;

        // The codec refuses the name; requests built by hand must not get through either.
        if app.is_updater() {
            return Err(UpdateError::ReservedName {
                name: app.name().to_string(),
            }
            .into());
        }

        let visible = behavior.shows_messages();
        let observer: &dyn UpdateObserver = if visible { self.ui } else { &NoopObserver };

        info!("Updating {} ({})", app, behavior);
        let directory = match self
            .engine
            .update_with(&app, credentials.as_ref(), observer, &CancelToken::new())
            .await
        {
            Ok(directory) => directory,
            Err(e) => {
                error!("{:#}", e);
                if visible {
                    self.ui.show_error(&failure_message(&app, &e));
                }
                return Err(e);
            }
        };

        let relaunched = match behavior {
            UpdaterBehavior::Hidden => None,
            UpdaterBehavior::ShowMessages => {
                self.ui.show_success(&format!("{} was successfully updated!", app.name()));
                None
            }
            UpdaterBehavior::RunAfterUpdate => match self.relaunch(&app, &relaunch_args) {
                Ok(pid) => Some(pid),
                Err(e) => {
                    self.ui.show_error(&failure_message(&app, &e));
                    return Err(e);
                }
            },
        };

        Ok(UpdaterOutcome {
            directory,
            relaunched,
        })
    }

    fn relaunch(&self, app: &AppDescriptor, relaunch_args: &str) -> Result<u32> {
        let layout = self.engine.layout();
        let executable = layout.executable(app).ok_or_else(|| UpdateError::MissingExecutable {
            path: layout.executable_path(app).display().to_string(),
        })?;

        debug!("Relaunching {} with '{}'", executable.display(), relaunch_args);
        let child = Command::new(&executable)
            .args(relaunch_args.split_whitespace())
            .current_dir(layout.app_dir(app))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", executable.display()))?;
        Ok(child.id())
    }
}

/// The message shown when updating `app` failed.
///
/// Network failures anywhere in the chain get a message of their own; anything else
/// lists every cause.
pub fn failure_message(app: &AppDescriptor, error: &anyhow::Error) -> String {
    if find_update_error(error).is_some_and(UpdateError::is_network) {
        return format!(
            "There was a problem with the internet connection while updating {}.",
            app.name()
        );
    }

    format!("{} could not be updated.\n{}", app.name(), format_error_chain(error))
}

//! Console user interface of the updater binary.

use crate::models::AppDescriptor;
use crate::upgrade::{DownloadProgress, UpdateObserver};
use crate::utils::progress::ProgressBar;
use colored::Colorize;
use std::sync::Mutex;

/// Where the updater reports to the person watching.
///
/// The engine-facing half is [`UpdateObserver`]; the two methods here are the updater's
/// final word after the transaction.
pub trait UpdaterUi: UpdateObserver {
    fn show_success(&self, message: &str);

    fn show_error(&self, message: &str);
}

/// Progress bar on stderr, coloured messages on stdout and stderr.
pub struct ConsoleUi {
    show_progress: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleUi {
    pub fn new(show_progress: bool) -> Self {
        Self {
            show_progress,
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        // A poisoned bar only loses drawing.
        if let Ok(mut bar) = self.bar.lock() {
            f(&mut bar);
        }
    }
}

impl UpdateObserver for ConsoleUi {
    fn on_progress(&self, app: &AppDescriptor, progress: DownloadProgress) {
        if !self.show_progress {
            return;
        }
        self.with_bar(|bar| {
            let bar = bar.get_or_insert_with(|| {
                ProgressBar::new_download(progress.total, format!("Downloading {}", app.name()))
            });
            if let Some(total) = progress.total {
                bar.set_length(total);
            }
            bar.set_position(progress.received);
        });
    }

    fn on_complete(&self, _app: &AppDescriptor, _error: Option<&anyhow::Error>) {
        self.with_bar(|bar| {
            if let Some(bar) = bar.take() {
                bar.finish_and_clear();
            }
        });
    }
}

impl UpdaterUi for ConsoleUi {
    fn show_success(&self, message: &str) {
        println!("{} {}", "✓".green(), message.green());
    }

    fn show_error(&self, message: &str) {
        eprintln!("{}: {}", "error".red().bold(), message);
    }
}

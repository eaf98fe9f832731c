//! Terminal progress display for package downloads.
//!
//! A thin wrapper over `indicatif` with one download style. Bars are hidden when the
//! `UPDRAFT_NO_PROGRESS` environment variable is set to any value, or when the caller
//! asks for a hidden bar (for example because the configuration disables progress).

use crate::constants::NO_PROGRESS_ENV_VAR;
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// Whether progress bars are disabled through the environment.
pub fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV_VAR).is_ok()
}

/// A progress bar for one transfer.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Bar for a download of `total` bytes, or a spinner when the size is unknown.
    pub fn new_download(total: Option<u64>, prefix: impl Into<String>) -> Self {
        if is_progress_disabled() {
            return Self::hidden();
        }

        let bar = match total {
            Some(total) => {
                let bar = IndicatifBar::new(total);
                bar.set_style(download_style());
                bar
            }
            None => {
                let bar = IndicatifBar::new_spinner();
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        bar.set_prefix(prefix.into());
        Self {
            inner: bar,
        }
    }

    /// A bar that draws nothing.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    /// Switch to a known length once the transfer reports one.
    pub fn set_length(&self, len: u64) {
        if self.inner.length() != Some(len) {
            self.inner.set_length(len);
            self.inner.set_style(download_style());
        }
    }

    pub fn set_position(&self, pos: u64) {
        self.inner.set_position(pos);
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

/// `📥 [━━━━━━━━━━━━━━━━━━━━] 2.1MB/2.1MB (00:05)`
fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold.cyan} {spinner:.cyan} {bytes}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

//! Filesystem and terminal helpers.
//!
//! # Modules
//!
//! - [`fs`] - suffix staging primitives, zip extraction and directory helpers
//! - [`progress`] - download progress bars

pub mod fs;
pub mod progress;

pub use fs::{ensure_dir, remove_dir_all};
pub use progress::ProgressBar;

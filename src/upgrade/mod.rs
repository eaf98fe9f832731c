//! The update transaction engine.
//!
//! This module installs and updates application directories from versioned zip
//! packages, guaranteeing that a failed update leaves the directory exactly as it was.
//!
//! # Architecture Overview
//!
//! - **[`UpdateEngine`]**: orchestrates the install and update flows
//! - **[`Downloader`]**: fetches the package and its optional checksum manifest
//! - **[`ChecksumVerifier`]**: the only gate between downloaded and installed bytes
//! - **[`backup::StagedBackup`]**: suffix-based staging with commit and rollback
//! - **[`EngineConfig`]**: settings read from the `[engine]` configuration table
//!
//! ## Update Process Flow
//!
//! ```text
//! 1. Preparation
//!    ├── Create the application directory if needed
//!    ├── Clear the temp directory
//!    └── Delete backup entries left by an interrupted update
//!
//! 2. Download
//!    ├── Fetch "<address>/<version>/<name> <version>.zip"
//!    ├── Fetch the manifest next to it, if there is one
//!    └── Verify the archive checksum
//!
//! 3. Staging
//!    └── Rename every top-level entry with the backup suffix (ignored entries stay)
//!
//! 4. Extraction
//!    ├── Success: delete the suffixed originals
//!    └── Failure: delete the new entries and strip the suffix from the originals
//!
//! 5. Cleanup
//!    └── Clear the temp directory, whatever happened
//! ```
//!
//! # Concurrency
//!
//! One transaction runs at a time per process. Nothing prevents two processes from
//! updating the same directory; callers must not do that.
//!
//! # Module Structure
//!
//! - [`engine`]: install and update flows, observer interface
//! - [`download`]: package retrieval, progress stream, cancellation
//! - [`verification`]: SHA-256 digests and manifests
//! - [`backup`]: the staging transaction
//! - [`version_check`]: version comparison helpers
//! - [`config`]: engine settings

pub mod backup;
pub mod config;
pub mod download;
pub mod engine;
pub mod verification;
pub mod version_check;


pub use config::EngineConfig;
pub use download::{CancelToken, DownloadProgress, DownloadTask, Downloader};
pub use engine::{NoopObserver, UpdateEngine, UpdateObserver};
pub use verification::{ChecksumVerifier, UpdateManifest};
pub use version_check::is_update_available;

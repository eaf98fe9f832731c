//! updraft - crash-safe self-updates for desktop applications
//!
//! An application cannot overwrite its own running executable, so updraft splits an
//! update across two processes. The running application hands the request over to a
//! separate updater process through command-line arguments and exits; the updater
//! downloads the new version, verifies it and swaps it into the application directory
//! as a transaction that either commits completely or rolls back to the exact previous
//! contents.
//!
//! # Architecture Overview
//!
//! ```text
//! <root>/
//! ├── Foo/               one directory per installed application
//! ├── Bar/
//! ├── Updater/           the updater installation
//! └── Updater tmp/       download scratch space, gone after every run
//! ```
//!
//! Packages are zip archives published as `<address>/<version>/<name> <version>.zip`,
//! optionally next to a `<name> <version>.toml` manifest carrying the archive's SHA-256.
//!
//! ## Key Features
//!
//! - **Transactional**: pre-update entries are renamed with a backup suffix, then either
//!   deleted (commit) or restored (rollback)
//! - **Verified**: nothing in the application directory changes before the checksum matches
//! - **Preserving**: ignored directories such as user data are never touched
//! - **Self-maintaining**: applications can install or update the updater itself
//!
//! # Core Modules
//!
//! - [`models`] - application descriptors, credentials, updater behaviors
//! - [`layout`] - where applications, the updater and scratch files live
//! - [`context`] - the application the running process belongs to
//! - [`handoff`] - the argument protocol and both ends of the process handoff
//! - [`upgrade`] - download, verification and the install/update transaction
//! - [`config`] - the optional global configuration file
//! - [`cli`] - the updater binary's command line
//! - [`core`] - error types and user-facing error formatting
//! - [`utils`] - filesystem primitives and progress display
//!
//! # Example
//!
//! ```rust,no_run
//! use semver::Version;
//! use updraft::context::AppContext;
//! use updraft::handoff::Handoff;
//! use updraft::models::{AppDescriptor, UpdaterBehavior};
//! use updraft::upgrade::is_update_available;
//!
//! # fn example() -> anyhow::Result<()> {
//! let me = AppDescriptor::builder("Foo", "https://downloads.example.test/foo")
//!     .installed_version(Version::new(1, 0, 0))
//!     .build()?;
//! let context = AppContext::builder().current(me)?.build()?;
//!
//! let latest = AppDescriptor::builder("Foo", "https://downloads.example.test/foo")
//!     .installed_version(Version::new(1, 0, 0))
//!     .latest_version(Version::new(1, 1, 0))
//!     .ignored_directories(["logs"])
//!     .build()?;
//!
//! if is_update_available(&latest) {
//!     Handoff::new(&context).run(&latest, UpdaterBehavior::RunAfterUpdate, None)?;
//!     std::process::exit(0);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod core;
pub mod handoff;
pub mod layout;
pub mod models;
pub mod upgrade;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

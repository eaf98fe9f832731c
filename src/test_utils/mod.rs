//! Test utilities for updraft
//!
//! Helpers shared by unit tests and the integration suite: logging setup, zip package
//! fixtures and `file://` package sources.
//!
//! # Example
//!
//! ```rust,no_run
//! use updraft::test_utils::{PackageFixture, PackageSource};
//!
//! # fn example(dir: &std::path::Path) -> anyhow::Result<()> {
//! let source = PackageSource::new(dir)?;
//! let archive = PackageFixture::new().file("Foo", "binary").to_zip()?;
//! source.publish_verified("Foo", "1.2.0", &archive)?;
//! # Ok(())
//! # }
//! ```

pub mod fixtures;

pub use fixtures::{PackageFixture, PackageSource, sha256_hex};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialise tracing for tests, once per process.
///
/// With `level` the given level is used; otherwise `RUST_LOG` is honoured if set, and
/// nothing is logged if not.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

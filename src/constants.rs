//! Names and markers shared by the caller process and the updater process.
//!
//! These values are part of the on-disk layout and the handoff contract. Changing any
//! of them breaks compatibility with applications that were built against an earlier
//! release, so treat them as frozen.

/// Name of the updater application itself.
///
/// An [`AppDescriptor`](crate::models::AppDescriptor) may never use this name: the updater
/// refuses to target its own installation.
pub const UPDATER_NAME: &str = "Updater";

/// Directory under the root that holds the updater installation.
pub const UPDATER_DIRECTORY_NAME: &str = "Updater";

/// Scratch directory under the root used for downloads.
///
/// Deleted at the start and at the end of every install or update.
pub const TEMP_DIRECTORY_NAME: &str = "Updater tmp";

/// Marker appended to the name of every pre-update original while an update is staged.
pub const BACKUP_SUFFIX: &str = "_UDbackup";

/// File extension of package archives.
pub const PACKAGE_EXTENSION: &str = "zip";

/// File extension of checksum manifests published next to package archives.
pub const MANIFEST_EXTENSION: &str = "toml";

/// Environment variable that overrides the global configuration file location.
pub const CONFIG_ENV_VAR: &str = "UPDRAFT_CONFIG";

/// Environment variable that disables progress bars.
pub const NO_PROGRESS_ENV_VAR: &str = "UPDRAFT_NO_PROGRESS";

/// Version of this crate, used as the expected version of the updater installation.
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

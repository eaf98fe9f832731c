use crate::constants::{TEMP_DIRECTORY_NAME, UPDATER_DIRECTORY_NAME, UPDATER_NAME};
use crate::core::UpdateError;
use anyhow::Result;
use semver::Version;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path};

/// Names of directories inside an application directory that updates must leave alone.
///
/// Matching is by exact entry name at each directory level. An empty set and "no set"
/// mean the same thing: nothing is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredDirectories(BTreeSet<String>);

impl IgnoredDirectories {
    /// An empty set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether an entry with this name is ignored.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate the names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoredDirectories {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Immutable description of one installable application.
///
/// Built through [`AppDescriptor::builder`], which validates the name and the ignored
/// directories. The descriptor of the updater itself comes from [`AppDescriptor::updater`],
/// the only way to obtain one carrying the reserved name.
///
/// # Examples
///
/// ```rust,no_run
/// use semver::Version;
/// use updraft::models::AppDescriptor;
///
/// # fn example() -> anyhow::Result<()> {
/// let app = AppDescriptor::builder("Foo", "https://downloads.example.test/foo")
///     .installed_version(Version::new(1, 0, 0))
///     .latest_version(Version::new(1, 1, 0))
///     .ignored_directories(["cache", "logs"])
///     .build()?;
///
/// assert_eq!(app.directory_path(), "Foo");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDescriptor {
    name: String,
    installed_version: Option<Version>,
    latest_version: Option<Version>,
    directory_path: String,
    source_address: String,
    ignored_directories: IgnoredDirectories,
}

impl AppDescriptor {
    /// Start building a descriptor for `name`, fetched from `source_address`.
    pub fn builder(name: impl Into<String>, source_address: impl Into<String>) -> AppDescriptorBuilder {
        AppDescriptorBuilder {
            name: name.into(),
            source_address: source_address.into(),
            installed_version: None,
            latest_version: None,
            directory_path: None,
            ignored_directories: IgnoredDirectories::none(),
        }
    }

    /// Descriptor of the updater installation.
    #[must_use]
    pub fn updater(
        installed_version: Option<Version>,
        latest_version: Option<Version>,
        source_address: impl Into<String>,
    ) -> Self {
        Self {
            name: UPDATER_NAME.to_string(),
            installed_version,
            latest_version,
            directory_path: crate::constants::UPDATER_DIRECTORY_NAME.to_string(),
            source_address: source_address.into(),
            ignored_directories: IgnoredDirectories::none(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn installed_version(&self) -> Option<&Version> {
        self.installed_version.as_ref()
    }

    pub fn latest_version(&self) -> Option<&Version> {
        self.latest_version.as_ref()
    }

    /// The latest version, which every download needs.
    pub fn require_latest_version(&self) -> Result<&Version> {
        self.latest_version.as_ref().ok_or_else(|| {
            UpdateError::validation(format!("No latest version is known for '{}'", self.name))
                .into()
        })
    }

    /// Directory name of the installation, relative to the root directory.
    pub fn directory_path(&self) -> &str {
        &self.directory_path
    }

    /// Base address that versioned packages are fetched from.
    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    pub fn ignored_directories(&self) -> &IgnoredDirectories {
        &self.ignored_directories
    }

    /// Whether this descriptor carries the reserved updater name.
    #[must_use]
    pub fn is_updater(&self) -> bool {
        self.name == UPDATER_NAME
    }

    /// File name of the package archive for the latest version, without extension.
    pub fn package_stem(&self) -> Result<String> {
        Ok(format!("{} {}", self.name, self.require_latest_version()?))
    }
}

impl fmt::Display for AppDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.installed_version, &self.latest_version) {
            (Some(installed), Some(latest)) => write!(f, "{} {installed} -> {latest}", self.name),
            (None, Some(latest)) => write!(f, "{} (new) -> {latest}", self.name),
            (Some(installed), None) => write!(f, "{} {installed}", self.name),
            (None, None) => write!(f, "{}", self.name),
        }
    }
}

/// Builder returned by [`AppDescriptor::builder`].
#[derive(Debug, Clone)]
pub struct AppDescriptorBuilder {
    name: String,
    source_address: String,
    installed_version: Option<Version>,
    latest_version: Option<Version>,
    directory_path: Option<String>,
    ignored_directories: IgnoredDirectories,
}

impl AppDescriptorBuilder {
    pub fn installed_version(mut self, version: Version) -> Self {
        self.installed_version = Some(version);
        self
    }

    pub fn latest_version(mut self, version: Version) -> Self {
        self.latest_version = Some(version);
        self
    }

    /// Override the directory name, which defaults to the application name.
    pub fn directory_path(mut self, directory: impl Into<String>) -> Self {
        self.directory_path = Some(directory.into());
        self
    }

    pub fn ignored_directories<I, S>(mut self, directories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_directories = directories.into_iter().collect();
        self
    }

    /// Validate and produce the descriptor.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Validation`] for an empty name, a directory that is not a single
    ///   plain entry under the root, or an ignored directory name that is empty or
    ///   contains `:` (the handoff separator)
    /// - [`UpdateError::ReservedName`] when the name is the updater's
    pub fn build(self) -> Result<AppDescriptor> {
        if self.name.is_empty() {
            return Err(UpdateError::validation("Application name must not be empty").into());
        }
        if self.name == UPDATER_NAME {
            return Err(UpdateError::ReservedName {
                name: self.name,
            }
            .into());
        }

        let directory_path = self.directory_path.unwrap_or_else(|| self.name.clone());
        validate_directory_path(&directory_path)?;

        if let Some(bad) =
            self.ignored_directories.iter().find(|d| d.is_empty() || d.contains(':'))
        {
            return Err(UpdateError::validation(format!(
                "Ignored directory name '{bad}' must be non-empty and must not contain ':'"
            ))
            .into());
        }

        Ok(AppDescriptor {
            name: self.name,
            installed_version: self.installed_version,
            latest_version: self.latest_version,
            directory_path,
            source_address: self.source_address,
            ignored_directories: self.ignored_directories,
        })
    }
}

/// The install directory must be one plain entry directly under the root, distinct from
/// the updater and scratch directories.
fn validate_directory_path(directory: &str) -> Result<()> {
    let mut components = Path::new(directory).components();
    let single_entry =
        matches!((components.next(), components.next()), (Some(Component::Normal(_)), None));

    let reason = if directory.is_empty() {
        Some("must not be empty")
    } else if directory.contains("..") {
        Some("must not refer to a parent directory")
    } else if !single_entry || directory.contains(['/', '\\']) {
        Some("must be a single directory name under the root")
    } else if directory == UPDATER_DIRECTORY_NAME || directory == TEMP_DIRECTORY_NAME {
        Some("is reserved for the updater")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(UpdateError::validation(format!(
            "Application directory '{directory}' {reason}"
        ))
        .into()),
        None => Ok(()),
    }
}

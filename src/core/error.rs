//! Error handling for updraft
//!
//! The error system follows two rules:
//! 1. **Strongly-typed kinds** ([`UpdateError`]) so callers can react to a specific failure,
//!    for example showing a network-specific message.
//! 2. **Causes stay attached.** Library functions return [`anyhow::Result`] and attach the
//!    typed kind as a context layer on top of the underlying I/O, zip or HTTP error, so
//!    `error.downcast_ref::<UpdateError>()` finds the kind while `error.chain()` still
//!    yields the root cause.
//!
//! # Error Categories
//!
//! - **Validation**: [`UpdateError::Validation`], [`UpdateError::ReservedName`]
//! - **Handoff protocol**: [`UpdateError::ArgumentCount`], [`UpdateError::MalformedArgument`],
//!   [`UpdateError::UnknownBehavior`]
//! - **Transport**: [`UpdateError::Network`], [`UpdateError::DownloadCancelled`]
//! - **Integrity**: [`UpdateError::ChecksumMismatch`]
//! - **Filesystem**: [`UpdateError::IoTransfer`]
//! - **Installation state**: [`UpdateError::UpdaterNotInstalled`],
//!   [`UpdateError::MissingExecutable`], [`UpdateError::CurrentAlreadyBound`],
//!   [`UpdateError::CurrentNotBound`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use anyhow::Context;
//! use updraft::core::{UpdateError, user_friendly_error};
//!
//! fn rename_entry() -> anyhow::Result<()> {
//!     std::fs::rename("a", "b").context(UpdateError::io_transfer("rename", "a"))
//! }
//!
//! if let Err(e) = rename_entry() {
//!     user_friendly_error(e).display();
//! }
//! ```

use colored::Colorize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Every failure kind the update system distinguishes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// An application descriptor or another input failed validation.
    #[error("Validation failed: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// The handoff argument list has a length the decoder does not accept.
    #[error("Expected {expected} handoff arguments, got {actual}")]
    ArgumentCount {
        /// Human readable list of accepted counts
        expected: String,
        /// Number of arguments received
        actual: usize,
    },

    /// A single handoff argument could not be decoded.
    #[error("Malformed handoff argument #{index}: {reason}")]
    MalformedArgument {
        /// Zero-based position in the argument list
        index: usize,
        /// Why decoding failed
        reason: String,
    },

    /// The behavior flag is not one of the known updater behaviors.
    #[error("Unknown updater behavior '{value}'")]
    UnknownBehavior {
        /// The rejected value
        value: String,
    },

    /// Transport-level failure talking to the package source.
    #[error("Network error: {operation}")]
    Network {
        /// What was being fetched
        operation: String,
        /// Transport or status description
        reason: String,
    },

    /// The downloaded archive does not match its manifest.
    #[error("Checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Archive file name
        file: String,
        /// Checksum stated by the manifest
        expected: String,
        /// Checksum computed from the downloaded bytes
        actual: String,
    },

    /// A rename, delete or extraction inside an install directory failed.
    #[error("Failed to {operation} '{path}'")]
    IoTransfer {
        /// Filesystem operation that failed
        operation: String,
        /// Path the operation was applied to
        path: String,
    },

    /// The descriptor uses the name reserved for the updater.
    #[error("Application name '{name}' is reserved for the updater")]
    ReservedName {
        /// The rejected name
        name: String,
    },

    /// No updater installation exists under the root directory.
    #[error("The updater is not installed")]
    UpdaterNotInstalled,

    /// The executable of an application could not be found.
    #[error("Executable '{path}' could not be found")]
    MissingExecutable {
        /// Expected executable location
        path: String,
    },

    /// The asynchronous download was cancelled before it completed.
    #[error("The download was cancelled")]
    DownloadCancelled,

    /// The current application was bound a second time.
    #[error("Current application is already set to '{name}'")]
    CurrentAlreadyBound {
        /// Name of the application already bound
        name: String,
    },

    /// An operation needed the current application but none was bound.
    #[error("The current application has not been set")]
    CurrentNotBound,

    /// The global configuration could not be used.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Description of the problem
        message: String,
    },
}

impl UpdateError {
    /// Build an [`UpdateError::IoTransfer`] for `operation` on `path`.
    pub fn io_transfer(operation: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::IoTransfer {
            operation: operation.into(),
            path: path.as_ref().display().to_string(),
        }
    }

    /// Build an [`UpdateError::Network`] for `operation`.
    pub fn network(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Network {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Build an [`UpdateError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Whether this failure came from the transport rather than local state.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network {
                ..
            }
        )
    }
}

/// Find the outermost typed [`UpdateError`] in an error chain.
///
/// Context layers are searched through `anyhow`'s own downcast, which sees context values
/// that plain `dyn Error` downcasting over `chain()` cannot.
#[must_use]
pub fn find_update_error(error: &anyhow::Error) -> Option<&UpdateError> {
    error
        .downcast_ref::<UpdateError>()
        .or_else(|| error.chain().find_map(|cause| cause.downcast_ref::<UpdateError>()))
}

/// Render an error and every nested cause, one indented line per cause.
#[must_use]
pub fn format_error_chain(error: &anyhow::Error) -> String {
    error.chain().map(|cause| format!("  {cause}")).collect::<Vec<_>>().join("\n")
}

/// An [`UpdateError`] enriched with a suggestion and details for the user.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error kind
    pub error: UpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] for display.
///
/// Typed kinds anywhere in the chain get a tailored suggestion; the full chain of causes
/// always ends up in the details so nothing underneath is hidden from the user.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    let chain_details = if causes.is_empty() {
        None
    } else {
        let mut message = String::from("Caused by:");
        for (i, cause) in causes.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
        Some(message)
    };

    if let Some(update_error) = find_update_error(&error) {
        let ctx = create_error_context(update_error.clone());
        return match chain_details {
            Some(chain) => {
                let details = match &ctx.details {
                    Some(existing) => format!("{existing}\n{chain}"),
                    None => chain,
                };
                ctx.with_details(details)
            }
            None => ctx,
        };
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(UpdateError::Other {
                    message: io_error.to_string(),
                })
                .with_suggestion("Close the application being updated and check directory permissions")
                .with_details("The updater needs write access to the application directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(UpdateError::Other {
                    message: io_error.to_string(),
                })
                .with_suggestion("Check that the root directory and the application directory exist");
            }
            _ => {}
        }
    }

    let ctx = ErrorContext::new(UpdateError::Other {
        message: error.to_string(),
    });
    match chain_details {
        Some(details) => ctx.with_details(details),
        None => ctx,
    }
}

fn create_error_context(error: UpdateError) -> ErrorContext {
    match &error {
        UpdateError::Network { reason, .. } => {
            let details = format!("The package source could not be reached: {reason}");
            ErrorContext::new(error)
                .with_suggestion("Check your internet connection and the application's source address")
                .with_details(details)
        }

        UpdateError::ChecksumMismatch { .. } => ErrorContext::new(error)
            .with_suggestion("The download was corrupted or tampered with. Try again later")
            .with_details("Nothing was changed in the application directory"),

        UpdateError::IoTransfer { .. } => ErrorContext::new(error)
            .with_suggestion("Close every running instance of the application and try again")
            .with_details("The application directory was restored to its previous state"),

        UpdateError::ArgumentCount { .. }
        | UpdateError::MalformedArgument { .. }
        | UpdateError::UnknownBehavior { .. } => ErrorContext::new(error)
            .with_suggestion("The updater must be started by the application being updated")
            .with_details("The handoff arguments were not produced by a compatible version"),

        UpdateError::UpdaterNotInstalled => ErrorContext::new(error)
            .with_suggestion("Install the updater before requesting an update"),

        UpdateError::ReservedName { .. } => ErrorContext::new(error)
            .with_suggestion("Rename the application; the updater name cannot be targeted"),

        UpdateError::DownloadCancelled => ErrorContext::new(error)
            .with_details("The application directory was left untouched"),

        _ => ErrorContext::new(error),
    }
}

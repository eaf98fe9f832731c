//! Data model shared by the caller process and the updater process.
//!
//! - [`AppDescriptor`]: immutable description of one installable application
//! - [`UpdaterBehavior`]: what the updater does after a successful update
//! - [`Credentials`]: optional network credentials for the package source

mod app;
mod behavior;
mod credentials;

pub use app::{AppDescriptor, AppDescriptorBuilder, IgnoredDirectories};
pub use behavior::UpdaterBehavior;
pub use credentials::Credentials;

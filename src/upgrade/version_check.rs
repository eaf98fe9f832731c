//! Version comparison for installed applications.

use crate::models::AppDescriptor;
use semver::Version;

/// Whether `app` has a newer version than the one installed.
///
/// An application that is not installed yet always has an update available, as long as
/// a latest version is known.
pub fn is_update_available(app: &AppDescriptor) -> bool {
    match (app.installed_version(), app.latest_version()) {
        (Some(installed), Some(latest)) => latest > installed,
        (None, Some(_)) => true,
        (_, None) => false,
    }
}

/// Extract a version from `--version` output such as `updraft-updater 0.3.2`.
///
/// The last whitespace separated token that parses as a version wins; a leading `v`
/// is accepted.
pub fn parse_reported_version(output: &str) -> Option<Version> {
    output
        .split_whitespace()
        .rev()
        .find_map(|token| Version::parse(token.trim_start_matches('v')).ok())
}

/// One-line description of an application's version state.
pub fn format_version_info(app: &AppDescriptor) -> String {
    match (app.installed_version(), app.latest_version()) {
        (Some(installed), Some(latest)) if latest > installed => {
            format!("{} {installed} (update available: {latest})", app.name())
        }
        (Some(installed), _) => format!("{} {installed} (up to date)", app.name()),
        (None, Some(latest)) => format!("{} not installed (available: {latest})", app.name()),
        (None, None) => format!("{} not installed", app.name()),
    }
}

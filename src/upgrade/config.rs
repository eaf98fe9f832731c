use crate::constants::CRATE_VERSION;
use serde::Deserialize;

/// Settings of the update engine.
///
/// Stored in the `[engine]` table of the global configuration file. Every field has a
/// default, so an absent table or a partial table is fine.
///
/// ```toml
/// [engine]
/// verify_checksum = true
/// user_agent = "updraft/0.3.2"
/// show_progress = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Fetch the checksum manifest and verify the archive against it.
    ///
    /// When disabled the manifest is not even requested.
    #[serde(default = "default_verify_checksum")]
    pub verify_checksum: bool,

    /// `User-Agent` header sent with HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Draw a progress bar while downloading.
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verify_checksum: default_verify_checksum(),
            user_agent: default_user_agent(),
            show_progress: default_show_progress(),
        }
    }
}

fn default_verify_checksum() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("updraft/{CRATE_VERSION}")
}

fn default_show_progress() -> bool {
    true
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

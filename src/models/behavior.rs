use crate::core::UpdateError;
use std::fmt;
use std::str::FromStr;

/// What the updater does once the update transaction has finished.
///
/// The wire form is the upper-case name (`"RUN_AFTER_UPDATE"`); the numeric codes
/// `0`, `1` and `2` are accepted on decode as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdaterBehavior {
    /// Nothing reaches the user: no progress and no messages.
    Hidden,
    /// Show success and error messages.
    ShowMessages,
    /// Show error messages and relaunch the updated application on success.
    #[default]
    RunAfterUpdate,
}

impl UpdaterBehavior {
    /// Wire name of this behavior.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hidden => "HIDDEN",
            Self::ShowMessages => "SHOW_MESSAGES",
            Self::RunAfterUpdate => "RUN_AFTER_UPDATE",
        }
    }

    /// Whether any message should reach the user.
    #[must_use]
    pub const fn shows_messages(self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

impl fmt::Display for UpdaterBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdaterBehavior {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIDDEN" | "0" => Ok(Self::Hidden),
            "SHOW_MESSAGES" | "1" => Ok(Self::ShowMessages),
            "RUN_AFTER_UPDATE" | "2" => Ok(Self::RunAfterUpdate),
            other => Err(UpdateError::UnknownBehavior {
                value: other.to_string(),
            }),
        }
    }
}

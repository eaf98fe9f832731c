//! Command-line encoding of an update request.
//!
//! The caller process hands an update over to the updater process through positional
//! arguments only. The order is fixed:
//!
//! | # | Field | Form |
//! |---|-------|------|
//! | 0 | application name | text |
//! | 1 | version to install | semantic version |
//! | 2 | directory name | text |
//! | 3 | source address | text |
//! | 4 | ignored directories | `{a:b:c}`, `{}` when empty |
//! | 5 | behavior | `HIDDEN`, `SHOW_MESSAGES` or `RUN_AFTER_UPDATE` |
//! | 6-8 | user name, password, domain | each wrapped in `{` `}` |
//! | 9 | caller's own arguments | text, optional |
//!
//! Text fields replace every space with `%20`. A value that already contains `%20`
//! decodes to a space, a limitation kept for compatibility with existing installations.
//!
//! The encoder always writes the credential triple (`{}{}{}` without credentials) and only
//! appends the last field when there is something to pass through. The decoder also
//! accepts the shorter forms without credentials, so the accepted lengths are 6, 7, 9
//! and 10.

use crate::core::UpdateError;
use crate::models::{AppDescriptor, Credentials, IgnoredDirectories, UpdaterBehavior};
use anyhow::Result;
use semver::Version;

const ENCODED_SPACE: &str = "%20";

const IGNORED_SEPARATOR: &str = ":";

/// Accepted argument list lengths.
const VALID_COUNTS: [usize; 4] = [6, 7, 9, 10];

/// Everything the updater process needs to perform one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffRequest {
    /// Application to update; its latest version is the one to install.
    pub app: AppDescriptor,
    pub behavior: UpdaterBehavior,
    pub credentials: Option<Credentials>,
    /// The caller's own command line, replayed on relaunch. Empty when there is none.
    pub relaunch_args: String,
}

/// Encoder and decoder for [`HandoffRequest`] argument lists.
pub struct ArgumentCodec;

impl ArgumentCodec {
    /// Encode `request` as an ordered argument list.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Validation`] when the application has no latest version.
    pub fn encode(request: &HandoffRequest) -> Result<Vec<String>> {
        let app = &request.app;
        let version = app.require_latest_version()?;

        let mut args = vec![
            Self::encode_value(app.name()),
            version.to_string(),
            Self::encode_value(app.directory_path()),
            Self::encode_value(app.source_address()),
            Self::encode_ignored(app.ignored_directories()),
            request.behavior.as_str().to_string(),
        ];
        args.extend(Self::encode_credentials(request.credentials.as_ref()));

        if !request.relaunch_args.is_empty() {
            args.push(Self::encode_value(&request.relaunch_args));
        }
        Ok(args)
    }

    /// Decode an argument list produced by [`ArgumentCodec::encode`].
    ///
    /// # Errors
    ///
    /// - [`UpdateError::ArgumentCount`] for a length other than 6, 7, 9 or 10
    /// - [`UpdateError::MalformedArgument`] for a bad version, ignored list or credential
    /// - [`UpdateError::UnknownBehavior`] for an unrecognized behavior
    /// - [`UpdateError::ReservedName`] when the request targets the updater itself
    pub fn decode<S: AsRef<str>>(args: &[S]) -> Result<HandoffRequest> {
        if !VALID_COUNTS.contains(&args.len()) {
            return Err(UpdateError::ArgumentCount {
                expected: "6, 7, 9 or 10".to_string(),
                actual: args.len(),
            }
            .into());
        }
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let arg = |index: usize| args[index];

        let name = Self::decode_value(arg(0));
        let version = Version::parse(arg(1)).map_err(|e| UpdateError::MalformedArgument {
            index: 1,
            reason: format!("'{}' is not a valid version: {e}", arg(1)),
        })?;
        let directory = Self::decode_value(arg(2));
        let address = Self::decode_value(arg(3));
        let ignored = Self::decode_ignored(4, arg(4))?;
        let behavior: UpdaterBehavior = arg(5).parse()?;

        let (credentials, relaunch_index) = if args.len() >= 9 {
            (Self::decode_credentials(6, [arg(6), arg(7), arg(8)])?, 9)
        } else {
            (None, 6)
        };
        let relaunch_args = args
            .get(relaunch_index)
            .map(|value| Self::decode_value(value))
            .unwrap_or_default();

        let app = AppDescriptor::builder(name, address)
            .latest_version(version)
            .directory_path(directory)
            .ignored_directories(ignored.iter().map(str::to_string))
            .build()?;

        Ok(HandoffRequest {
            app,
            behavior,
            credentials,
            relaunch_args,
        })
    }

    /// Replace every space with `%20`.
    pub fn encode_value(value: &str) -> String {
        value.replace(' ', ENCODED_SPACE)
    }

    /// Replace every `%20` with a space.
    pub fn decode_value(value: &str) -> String {
        value.replace(ENCODED_SPACE, " ")
    }

    /// `{a:b:c}` in sorted order, `{}` for the empty set.
    pub fn encode_ignored(ignored: &IgnoredDirectories) -> String {
        let names: Vec<String> = ignored.iter().map(Self::encode_value).collect();
        format!("{{{}}}", names.join(IGNORED_SEPARATOR))
    }

    /// Parse the ignored directory list found at position `index`.
    pub fn decode_ignored(index: usize, value: &str) -> Result<IgnoredDirectories> {
        let inner = strip_braces(value).ok_or_else(|| UpdateError::MalformedArgument {
            index,
            reason: format!("ignored directories '{value}' must be enclosed in braces"),
        })?;
        if inner.is_empty() {
            return Ok(IgnoredDirectories::none());
        }

        let mut names = Vec::new();
        for name in inner.split(IGNORED_SEPARATOR) {
            if name.is_empty() {
                return Err(UpdateError::MalformedArgument {
                    index,
                    reason: format!("ignored directories '{value}' contain an empty name"),
                }
                .into());
            }
            names.push(Self::decode_value(name));
        }
        Ok(names.into_iter().collect())
    }

    fn encode_credentials(credentials: Option<&Credentials>) -> [String; 3] {
        let wrap = |value: &str| format!("{{{}}}", Self::encode_value(value));
        match credentials {
            Some(c) => [wrap(&c.username), wrap(&c.password), wrap(&c.domain)],
            None => [wrap(""), wrap(""), wrap("")],
        }
    }

    /// Three bracketed values starting at position `index`; all empty means none.
    fn decode_credentials(index: usize, values: [&str; 3]) -> Result<Option<Credentials>> {
        let field = |offset: usize| -> Result<String> {
            let inner = strip_braces(values[offset]).ok_or_else(|| UpdateError::MalformedArgument {
                index: index + offset,
                reason: "credentials must be enclosed in braces".to_string(),
            })?;
            Ok(Self::decode_value(inner))
        };
        let credentials = Credentials {
            username: field(0)?,
            password: field(1)?,
            domain: field(2)?,
        };

        Ok((!credentials.is_empty()).then_some(credentials))
    }
}

fn strip_braces(value: &str) -> Option<&str> {
    value.strip_prefix('{')?.strip_suffix('}')
}

use crate::core::UpdateError;
use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Checksum document published next to a package archive.
///
/// The canonical form is a TOML table with a single key:
///
/// ```toml
/// sha256 = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
/// ```
///
/// A file holding nothing but the hex digest is accepted too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateManifest {
    sha256: String,
}

#[derive(Deserialize)]
struct RawManifest {
    sha256: Option<String>,
}

impl UpdateManifest {
    pub fn new(sha256: impl Into<String>) -> Self {
        Self {
            sha256: sha256.into(),
        }
    }

    /// Expected hex digest of the archive.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Parse manifest content.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Validation`] when the document carries no checksum.
    pub fn parse(content: &str) -> Result<Self> {
        let trimmed = content.trim();
        if trimmed.len() == 64 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Self::new(trimmed));
        }

        let raw: RawManifest = toml::from_str(content)
            .map_err(|e| UpdateError::validation(format!("Manifest is not valid TOML: {e}")))?;
        match raw.sha256 {
            Some(sha256) if !sha256.trim().is_empty() => Ok(Self::new(sha256.trim())),
            _ => Err(UpdateError::validation("No sha256 checksum could be found in the manifest")
                .into()),
        }
    }
}

/// Computes and compares SHA-256 digests of downloaded archives.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Compute the lowercase hex SHA-256 digest of a file.
    ///
    /// The file is streamed through the hasher on the blocking pool rather than read
    /// into memory.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use updraft::upgrade::verification::ChecksumVerifier;
    /// use std::path::Path;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let checksum = ChecksumVerifier::compute_sha256(Path::new("Foo 1.2.0.zip")).await?;
    /// println!("SHA256: {checksum}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compute_sha256(file_path: &Path) -> Result<String> {
        debug!("Computing SHA256 checksum for: {:?}", file_path);

        let path: PathBuf = file_path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<String> {
            let file = File::open(&path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            let mut reader = BufReader::new(file);
            let mut hasher = Sha256::new();
            io::copy(&mut reader, &mut hasher)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            Ok(hex::encode(hasher.finalize()))
        })
        .await
        .context("Checksum task panicked")?
    }

    /// Check a file against a manifest.
    ///
    /// Without a manifest there is nothing to compare and verification passes.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ChecksumMismatch`] when the digests differ (compared ignoring case).
    pub async fn verify(file_path: &Path, manifest: Option<&UpdateManifest>) -> Result<()> {
        let Some(manifest) = manifest else {
            warn!("No checksum manifest for {:?}, skipping verification", file_path);
            return Ok(());
        };

        info!("Verifying checksum for: {:?}", file_path);
        let actual = Self::compute_sha256(file_path).await?;

        if !actual.eq_ignore_ascii_case(manifest.sha256()) {
            let file = file_path.file_name().unwrap_or(file_path.as_os_str());
            return Err(UpdateError::ChecksumMismatch {
                file: file.to_string_lossy().into_owned(),
                expected: manifest.sha256().to_string(),
                actual,
            }
            .into());
        }

        info!("Checksum verification successful");
        Ok(())
    }
}

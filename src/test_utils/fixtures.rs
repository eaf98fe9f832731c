//! Package archives and `file://` package sources for tests.

use anyhow::{Context, Result, bail};
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Builder for an in-memory zip package.
#[derive(Clone, Debug, Default)]
pub struct PackageFixture {
    entries: Vec<(String, Option<Vec<u8>>)>,
}

impl PackageFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file entry.
    pub fn file(mut self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.entries.push((name.to_string(), Some(content.as_ref().to_vec())));
        self
    }

    /// Add an explicit directory entry.
    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push((name.trim_end_matches('/').to_string() + "/", None));
        self
    }

    /// The zip archive, entries stored uncompressed.
    pub fn to_zip(&self) -> Result<Vec<u8>> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in &self.entries {
            match content {
                Some(content) => {
                    writer.start_file(name.as_str(), options)?;
                    writer.write_all(content)?;
                }
                None => writer.add_directory(name.as_str(), options)?,
            }
        }
        Ok(writer.finish()?.into_inner())
    }

    /// An archive whose last file fails its CRC check while being extracted.
    ///
    /// Every entry before the last one extracts fine, so extraction fails partway.
    /// The last file's content must not appear anywhere else in the archive.
    pub fn to_corrupted_zip(&self) -> Result<Vec<u8>> {
        let Some(content) = self.entries.iter().rev().find_map(|(_, c)| c.as_ref()) else {
            bail!("A corrupted package needs at least one file");
        };
        if content.is_empty() {
            bail!("The last file of a corrupted package must not be empty");
        }

        let mut bytes = self.to_zip()?;
        let start = bytes
            .windows(content.len())
            .position(|window| window == content.as_slice())
            .context("File content not found in archive")?;
        for byte in &mut bytes[start..start + content.len()] {
            *byte = !*byte;
        }
        Ok(bytes)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A directory laid out like a package server: `<dir>/<version>/<name> <version>.zip`.
#[derive(Clone, Debug)]
pub struct PackageSource {
    dir: PathBuf,
}

impl PackageSource {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// `file://` address of the source.
    pub fn address(&self) -> Result<String> {
        Url::from_file_path(&self.dir)
            .map(|url| url.to_string())
            .map_err(|()| anyhow::anyhow!("'{}' is not an absolute path", self.dir.display()))
    }

    /// Publish an archive without a manifest.
    pub fn publish(&self, name: &str, version: &str, archive: &[u8]) -> Result<PathBuf> {
        let path = self.version_dir(version)?.join(format!("{name} {version}.zip"));
        fs::write(&path, archive)?;
        Ok(path)
    }

    /// Publish a manifest stating `sha256`.
    pub fn publish_manifest(&self, name: &str, version: &str, sha256: &str) -> Result<PathBuf> {
        let path = self.version_dir(version)?.join(format!("{name} {version}.toml"));
        fs::write(&path, format!("sha256 = \"{sha256}\"\n"))?;
        Ok(path)
    }

    /// Publish an archive together with a matching manifest.
    pub fn publish_verified(&self, name: &str, version: &str, archive: &[u8]) -> Result<PathBuf> {
        self.publish_manifest(name, version, &sha256_hex(archive))?;
        self.publish(name, version, archive)
    }

    fn version_dir(&self, version: &str) -> Result<PathBuf> {
        let dir = self.dir.join(version);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

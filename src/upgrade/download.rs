//! Package and manifest retrieval.
//!
//! For an application `Foo` at version `1.2.0` served from `https://host/foo`, the
//! downloader fetches
//!
//! - `https://host/foo/1.2.0/Foo 1.2.0.zip` into the layout's temp directory, and
//! - `https://host/foo/1.2.0/Foo 1.2.0.toml`, the optional checksum manifest.
//!
//! `http`, `https` and `file` addresses are supported. A missing manifest is tolerated;
//! everything else that goes wrong while talking to the source is an
//! [`UpdateError::Network`]. Checksum verification is the last step of every download.
//!
//! [`Downloader::start`] runs the download as a task and exposes its progress as a
//! stream. Progress updates always precede completion: the stream ends before
//! [`DownloadTask::finish`] yields the result.

use crate::constants::{MANIFEST_EXTENSION, PACKAGE_EXTENSION, TEMP_DIRECTORY_NAME};
use crate::core::UpdateError;
use crate::layout::Layout;
use crate::models::{AppDescriptor, Credentials};
use crate::upgrade::config::EngineConfig;
use crate::upgrade::verification::{ChecksumVerifier, UpdateManifest};
use anyhow::{Context, Result};
use futures::Stream;
use reqwest::Url;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Bytes received so far, and the total size when the source reports one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub received: u64,
    pub total: Option<u64>,
}

/// Cooperative cancellation flag shared between a download and whoever started it.
///
/// The flag is checked once the transfer completes; a cancelled download then fails
/// with [`UpdateError::DownloadCancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A download running in the background.
pub struct DownloadTask {
    progress: mpsc::UnboundedReceiver<DownloadProgress>,
    handle: JoinHandle<Result<PathBuf>>,
}

impl DownloadTask {
    /// Progress updates, ending when the transfer is over.
    pub fn progress(&mut self) -> impl Stream<Item = DownloadProgress> + '_ {
        futures::stream::poll_fn(move |cx| self.progress.poll_recv(cx))
    }

    /// Wait for the download and return the path of the verified archive.
    pub async fn finish(self) -> Result<PathBuf> {
        self.handle.await.context("Download task panicked")?
    }
}

/// Fetches package archives and their manifests.
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    layout: Layout,
    verify_checksum: bool,
}

impl Downloader {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be initialised.
    pub fn new(layout: Layout, config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to initialise HTTP client")?;
        Ok(Self {
            client,
            layout,
            verify_checksum: config.verify_checksum,
        })
    }

    /// Location of the package archive for `app`'s latest version.
    pub fn package_url(app: &AppDescriptor) -> Result<Url> {
        Self::versioned_url(app, PACKAGE_EXTENSION)
    }

    /// Location of the checksum manifest for `app`'s latest version.
    pub fn manifest_url(app: &AppDescriptor) -> Result<Url> {
        Self::versioned_url(app, MANIFEST_EXTENSION)
    }

    fn versioned_url(app: &AppDescriptor, extension: &str) -> Result<Url> {
        let version = app.require_latest_version()?;
        let address = app.source_address().trim_end_matches('/');
        let raw = format!("{address}/{version}/{}.{extension}", app.package_stem()?);
        Url::parse(&raw).map_err(|e| {
            UpdateError::validation(format!("Invalid source address '{address}': {e}")).into()
        })
    }

    /// Download and verify the latest package of `app`, waiting for completion.
    pub async fn download(
        &self,
        app: &AppDescriptor,
        credentials: Option<&Credentials>,
    ) -> Result<PathBuf> {
        let mut task = self.start(app, credentials, CancelToken::new());
        while task.progress.recv().await.is_some() {}
        task.finish().await
    }

    /// Start downloading the latest package of `app` in the background.
    pub fn start(
        &self,
        app: &AppDescriptor,
        credentials: Option<&Credentials>,
        cancel: CancelToken,
    ) -> DownloadTask {
        let (tx, rx) = mpsc::unbounded_channel();
        let downloader = self.clone();
        let app = app.clone();
        let credentials = credentials.cloned();

        let handle = tokio::spawn(async move {
            downloader.run(&app, credentials.as_ref(), &cancel, &tx).await
        });

        DownloadTask {
            progress: rx,
            handle,
        }
    }

    async fn run(
        &self,
        app: &AppDescriptor,
        credentials: Option<&Credentials>,
        cancel: &CancelToken,
        progress: &mpsc::UnboundedSender<DownloadProgress>,
    ) -> Result<PathBuf> {
        let package_url = Self::package_url(app)?;
        let temp = self.layout.directory(TEMP_DIRECTORY_NAME, true)?;
        let archive = temp.join(format!("{}.{PACKAGE_EXTENSION}", app.package_stem()?));

        info!("Downloading {} from {}", app, package_url);
        self.fetch_to_file(&package_url, &archive, credentials, progress).await?;

        if cancel.is_cancelled() {
            info!("Download of {} was cancelled", app.name());
            return Err(UpdateError::DownloadCancelled.into());
        }

        let manifest = if self.verify_checksum {
            self.fetch_manifest(&Self::manifest_url(app)?, credentials).await?
        } else {
            warn!("Checksum verification is disabled");
            None
        };
        ChecksumVerifier::verify(&archive, manifest.as_ref()).await?;

        debug!("Downloaded {} to {}", app.name(), archive.display());
        Ok(archive)
    }

    async fn fetch_to_file(
        &self,
        url: &Url,
        destination: &Path,
        credentials: Option<&Credentials>,
        progress: &mpsc::UnboundedSender<DownloadProgress>,
    ) -> Result<()> {
        let operation = format!("download {url}");
        let mut out = tokio::fs::File::create(destination)
            .await
            .context(UpdateError::io_transfer("create", destination))?;

        let mut received = 0u64;
        if url.scheme() == "file" {
            let source = local_path(url)?;
            let mut file = tokio::fs::File::open(&source)
                .await
                .map_err(|e| network_error(&operation, e))?;
            let total = file.metadata().await.ok().map(|m| m.len());
            let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
            loop {
                let read = file.read(&mut buffer).await.map_err(|e| network_error(&operation, e))?;
                if read == 0 {
                    break;
                }
                out.write_all(&buffer[..read])
                    .await
                    .context(UpdateError::io_transfer("write", destination))?;
                received += read as u64;
                // A closed receiver only means nobody is watching.
                let _ = progress.send(DownloadProgress {
                    received,
                    total,
                });
            }
        } else {
            let mut response = self.get(url, credentials, &operation).await?;
            if !response.status().is_success() {
                return Err(
                    UpdateError::network(&operation, format!("HTTP {}", response.status())).into()
                );
            }
            let total = response.content_length();
            while let Some(chunk) =
                response.chunk().await.map_err(|e| network_error(&operation, e))?
            {
                out.write_all(&chunk)
                    .await
                    .context(UpdateError::io_transfer("write", destination))?;
                received += chunk.len() as u64;
                let _ = progress.send(DownloadProgress {
                    received,
                    total,
                });
            }
        }

        out.flush().await.context(UpdateError::io_transfer("write", destination))?;
        debug!("Received {} bytes from {}", received, url);
        Ok(())
    }

    /// Fetch the checksum manifest, or `None` when the source has none.
    async fn fetch_manifest(
        &self,
        url: &Url,
        credentials: Option<&Credentials>,
    ) -> Result<Option<UpdateManifest>> {
        let operation = format!("download {url}");
        debug!("Fetching checksum manifest from: {}", url);

        let content = if url.scheme() == "file" {
            match tokio::fs::read_to_string(local_path(url)?).await {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("No checksum manifest found at {}", url);
                    return Ok(None);
                }
                Err(e) => return Err(network_error(&operation, e)),
            }
        } else {
            let response = self.get(url, credentials, &operation).await?;
            if !response.status().is_success() {
                warn!("Failed to fetch checksum manifest: HTTP {}", response.status());
                return Ok(None);
            }
            response.text().await.map_err(|e| network_error(&operation, e))?
        };

        UpdateManifest::parse(&content).map(Some)
    }

    async fn get(
        &self,
        url: &Url,
        credentials: Option<&Credentials>,
        operation: &str,
    ) -> Result<reqwest::Response> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(UpdateError::validation(format!(
                "Unsupported source address scheme '{}'",
                url.scheme()
            ))
            .into());
        }

        let mut request = self.client.get(url.clone());
        if let Some(credentials) = credentials {
            request = request.basic_auth(credentials.qualified_username(), Some(&credentials.password));
        }
        request.send().await.map_err(|e| network_error(operation, e))
    }
}

fn local_path(url: &Url) -> Result<PathBuf> {
    url.to_file_path().map_err(|()| {
        UpdateError::validation(format!("'{url}' does not name a local file")).into()
    })
}

/// Keep the transport error in the chain under a typed network kind.
fn network_error<E>(operation: &str, error: E) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let reason = error.to_string();
    anyhow::Error::new(error).context(UpdateError::network(operation, reason))
}

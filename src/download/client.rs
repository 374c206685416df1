//! Single-file download pipeline.
//!
//! [`Downloader::download`] runs one request through
//! `Requesting → Resolving name → Writing → Verifying` and stops at the first
//! failure. Nothing is retried.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::engine::TargetClaims;
use super::error::DownloadError;
use super::model::{DownloadRequest, RemoteFile};
use super::transport::{ReqwestTransport, Transport};
use super::verify::DownloadedFile;
use super::writer::{ensure_download_dir, write_stream};
use crate::config::{ConfigError, DownloaderConfig};

/// Downloads single files and verifies their size.
///
/// Cheap to clone; clones share the transport (and its connection pool).
///
/// # Example
///
/// ```no_run
/// use pudly::{DownloadRequest, Downloader};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let downloader = Downloader::new()?;
/// let request = DownloadRequest::new("https://example.com/paper.pdf").with_download_dir("papers");
/// let path = downloader.download(&request).await?;
/// println!("Downloaded: {}", path.display());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn Transport>,
    chunk_size: usize,
}

impl fmt::Debug for Downloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Downloader")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Creates a downloader with [`DownloaderConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(&DownloaderConfig::default())
    }

    /// Creates a downloader using the chunk size and timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` is out of range or the HTTP client
    /// cannot be built.
    #[instrument(level = "debug")]
    pub fn from_config(config: &DownloaderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout)
            .map_err(|source| ConfigError::HttpClient { source })?;
        Ok(Self::with_transport(Arc::new(transport), config.chunk_size))
    }

    /// Creates a downloader over any [`Transport`].
    ///
    /// A `chunk_size` of 0 is treated as 1.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>, chunk_size: usize) -> Self {
        Self {
            transport,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Upper bound on each chunk written to disk.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Downloads `request.url` and returns the path of the saved file.
    ///
    /// The file lands in `request.download_dir` (created if missing) or the
    /// current directory, under the name picked by
    /// [`resolve_name`](super::filename::resolve_name). An existing file with
    /// that name is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if:
    /// - the URL is invalid or the request fails (network error, timeout)
    /// - the server returns a non-2xx status
    /// - the directory or file cannot be written
    /// - the size on disk differs from `Content-Length` (a missing header
    ///   counts as 0)
    ///
    /// Request failures happen before any file is opened. A file truncated by
    /// a mid-stream failure is left on disk.
    #[must_use = "download result contains the path to the downloaded file"]
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn download(&self, request: &DownloadRequest) -> Result<PathBuf, DownloadError> {
        self.download_claiming(request, None).await
    }

    /// Same as [`download`](Self::download), but refuses to write a path
    /// another download in the same batch has already claimed.
    pub(crate) async fn download_claiming(
        &self,
        request: &DownloadRequest,
        claims: Option<&TargetClaims>,
    ) -> Result<PathBuf, DownloadError> {
        let response = self
            .transport
            .get(&request.url, &request.query_parameters)
            .await?;

        let remote = RemoteFile::from_response(response.as_ref(), &request.url);
        info!(
            url = %remote.url(),
            total_bytes = remote.total_size_bytes(),
            "starting download"
        );

        if let Some(dir) = &request.download_dir {
            ensure_download_dir(dir).await?;
        }
        let destination = request.destination_for(remote.resolved_name());
        if let Some(claims) = claims
            && !claims.claim(&destination)
        {
            return Err(DownloadError::duplicate_target(&request.url, destination));
        }
        debug!(
            filename = %remote.resolved_name(),
            path = %destination.display(),
            "resolved output path"
        );

        let bytes_written =
            write_stream(response.into_chunks(self.chunk_size), &destination).await?;
        debug!(
            bytes_written,
            total_bytes = remote.total_size_bytes(),
            "body written"
        );

        let path = DownloadedFile::new(destination, remote.total_size_bytes())
            .verify()
            .await?;

        info!(path = %path.display(), bytes = bytes_written, "download complete");
        Ok(path)
    }
}

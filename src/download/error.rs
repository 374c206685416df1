//! Error types for the download module.
//!
//! Every failure of a single download (transport, HTTP status, disk, size
//! verification) surfaces as one [`DownloadError`]. The variant and the
//! chained [`source`](std::error::Error::source) tell callers what went wrong.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed underlying cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during file downloads.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The provided URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
        /// Why the URL was rejected.
        #[source]
        source: url::ParseError,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors,
    /// body interrupted mid-stream, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// Connect or read timed out.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// Non-success HTTP response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while preparing or writing the destination.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Bytes on disk differ from the size the server advertised.
    #[error(
        "file size corrupted for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    SizeMismatch {
        /// Downloaded file that failed verification.
        path: PathBuf,
        /// Advertised size in bytes (0 when the server sent none).
        expected_bytes: u64,
        /// Size found on disk.
        actual_bytes: u64,
    },

    /// Another download in the same batch already writes to this path.
    #[error("{path} is already the target of another download in this batch ({url})")]
    DuplicateTarget {
        /// The URL whose download was refused.
        url: String,
        /// The contested destination path.
        path: PathBuf,
    },

    /// A batch task ended without producing a result (panic or cancellation).
    #[error("download task for {url} did not complete: {reason}")]
    TaskFailed {
        /// The URL the task was downloading.
        url: String,
        /// What happened to the task.
        reason: String,
    },
}

impl DownloadError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    /// Creates a network error from any transport error.
    pub fn network(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Network {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates a timeout error from the transport error that timed out.
    pub fn timeout(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Timeout {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a size mismatch error.
    pub fn size_mismatch(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::SizeMismatch {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates a duplicate target error.
    pub fn duplicate_target(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::DuplicateTarget {
            url: url.into(),
            path: path.into(),
        }
    }

    /// Creates a failed task error.
    pub fn task_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TaskFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

// We intentionally do NOT implement `From<reqwest::Error>` or
// `From<std::io::Error>`: every variant needs a url or path for context that
// the source errors don't carry. Use the constructors above.

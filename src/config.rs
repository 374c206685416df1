//! Runtime configuration for downloads.

use std::time::Duration;

use thiserror::Error;

use crate::download::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENCY, MAX_CONCURRENCY, MAX_TIMEOUT_SECS,
    MIN_CONCURRENCY, REQUEST_TIMEOUT,
};

/// Errors raised while validating configuration or building the HTTP client.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Chunk size of zero.
    #[error("invalid chunk size {value}: must be at least 1 byte")]
    InvalidChunkSize {
        /// The rejected value.
        value: usize,
    },

    /// Timeout outside 1..=3600 seconds.
    #[error("invalid timeout {value:?}: must be between 1 and {MAX_TIMEOUT_SECS} seconds")]
    InvalidTimeout {
        /// The rejected value.
        value: Duration,
    },

    /// Concurrency outside the supported range.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {source}")]
    HttpClient {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

/// Tunables shared by single and batch downloads.
///
/// Defaults: 25 MiB chunks, 10 second connect/read timeout, 5 parallel
/// downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Upper bound on the size of each chunk written to disk.
    pub chunk_size: usize,
    /// Connect and read timeout for each request.
    pub timeout: Duration,
    /// Number of downloads a batch runs at once.
    pub max_concurrency: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: REQUEST_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl DownloaderConfig {
    /// Checks every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize {
                value: self.chunk_size,
            });
        }
        if self.timeout.is_zero() || self.timeout > Duration::from_secs(MAX_TIMEOUT_SECS) {
            return Err(ConfigError::InvalidTimeout {
                value: self.timeout,
            });
        }
        validate_concurrency(self.max_concurrency)
    }
}

pub(crate) fn validate_concurrency(value: usize) -> Result<(), ConfigError> {
    if (MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidConcurrency { value })
    }
}

//! Post-download size verification.

use std::path::{Path, PathBuf};

use super::error::DownloadError;

/// Compares the on-disk size of `path` with `expected_size` for exact
/// equality.
///
/// An `expected_size` of 0 (size unknown) only matches an empty file.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] if the file metadata cannot be read.
pub async fn is_size_correct(path: &Path, expected_size: u64) -> Result<bool, DownloadError> {
    Ok(file_size(path).await? == expected_size)
}

async fn file_size(path: &Path) -> Result<u64, DownloadError> {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.len())
        .map_err(|e| DownloadError::io(path, e))
}

/// A file whose body has been fully written and flushed.
///
/// Only the download pipeline constructs one, after the writer returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    path: PathBuf,
    expected_size_bytes: u64,
}

impl DownloadedFile {
    pub(crate) fn new(path: PathBuf, expected_size_bytes: u64) -> Self {
        Self {
            path,
            expected_size_bytes,
        }
    }

    /// Where the file was written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size the server advertised.
    #[must_use]
    pub fn expected_size_bytes(&self) -> u64 {
        self.expected_size_bytes
    }

    /// See [`is_size_correct`].
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if the file metadata cannot be read.
    pub async fn size_is_correct(&self) -> Result<bool, DownloadError> {
        is_size_correct(&self.path, self.expected_size_bytes).await
    }

    /// Checks the size and hands back the path.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::SizeMismatch`] naming the path when the sizes
    /// differ, or [`DownloadError::Io`] if the file cannot be inspected.
    pub async fn verify(self) -> Result<PathBuf, DownloadError> {
        let actual = file_size(&self.path).await?;
        if actual != self.expected_size_bytes {
            return Err(DownloadError::size_mismatch(
                self.path,
                self.expected_size_bytes,
                actual,
            ));
        }
        Ok(self.path)
    }
}

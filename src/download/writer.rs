//! Streams response chunks to a file on disk.

use std::path::Path;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use super::error::DownloadError;

/// Creates `dir` and any missing parents.
///
/// An existing directory is not an error, including one created concurrently
/// by another download.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] if the directory cannot be created.
pub async fn ensure_download_dir(dir: &Path) -> Result<(), DownloadError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DownloadError::io(dir, e))
}

/// Writes every chunk of `chunks` to `destination` in order and returns the
/// number of bytes written.
///
/// The file is created or truncated. The stream is drained to the end; the
/// first chunk error stops the write and is returned as-is. A partial file
/// is left on disk in that case.
///
/// # Errors
///
/// Returns the stream's own error, or [`DownloadError::Io`] if the file cannot
/// be created, written or flushed.
pub async fn write_stream<S>(mut chunks: S, destination: &Path) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<Bytes, DownloadError>> + Unpin,
{
    let mut file = File::create(destination)
        .await
        .map_err(|e| DownloadError::io(destination, e))?;

    let mut bytes_written: u64 = 0;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;
        bytes_written += chunk.len() as u64;
        trace!(
            path = %destination.display(),
            chunk_bytes = chunk.len(),
            bytes_written,
            "chunk written"
        );
    }

    // Ensure all data is on disk before anyone stats the file
    file.flush()
        .await
        .map_err(|e| DownloadError::io(destination, e))?;
    file.sync_all()
        .await
        .map_err(|e| DownloadError::io(destination, e))?;

    debug!(path = %destination.display(), bytes_written, "stream written");
    Ok(bytes_written)
}

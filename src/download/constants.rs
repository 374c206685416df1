//! Constants for the download module (timeouts, chunk sizes, concurrency).

use std::time::Duration;

/// Bytes in one kibibyte.
pub const KIBIBYTE: usize = 1024;

/// Bytes in one mebibyte.
pub const MEBIBYTE: usize = 1024 * KIBIBYTE;

/// Connect and read timeout applied to every request (10 seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// [`REQUEST_TIMEOUT_SECS`] as a [`Duration`].
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(REQUEST_TIMEOUT_SECS);

/// Chunk size for size-checked downloads (25 MiB).
///
/// Large chunks mean few writes per file. Memory use per in-flight download
/// is bounded by this value.
pub const DEFAULT_CHUNK_SIZE: usize = 25 * MEBIBYTE;

/// Chunk size for memory-constrained downloads (10 KiB).
///
/// Earlier revisions of the tool streamed in 10 KiB chunks. Select it through
/// [`DownloaderConfig::chunk_size`](crate::DownloaderConfig) when many
/// downloads run in parallel on a small machine.
pub const SMALL_CHUNK_SIZE: usize = 10 * KIBIBYTE;

/// Default number of downloads a batch runs at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Longest accepted request timeout in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

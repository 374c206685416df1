//! HTTP download pipeline: stream a response to disk, verify its size.
//!
//! # Features
//!
//! - Streaming downloads in bounded chunks (25 MiB by default)
//! - Filename from `Content-Disposition`, else the (redirected) URL
//! - Byte-count verification against `Content-Length`
//! - Batches with a bounded number of parallel downloads
//! - One error type, [`DownloadError`], with the cause chained
//!
//! # Example
//!
//! ```no_run
//! use pudly::download::{DownloadRequest, Downloader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new()?;
//! let path = downloader
//!     .download(&DownloadRequest::new("https://example.com/paper.pdf"))
//!     .await?;
//! println!("Downloaded: {}", path.display());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
pub mod filename;
mod model;
mod transport;
mod verify;
mod writer;

pub use client::Downloader;
pub use constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENCY, REQUEST_TIMEOUT, REQUEST_TIMEOUT_SECS,
    SMALL_CHUNK_SIZE,
};
pub use engine::{BatchDownloader, BatchOutcome, BatchReport};
pub use error::{BoxError, DownloadError};
pub use filename::{filename_from_content_disposition, resolve_name, resolve_name_from_url};
pub use model::{DownloadRequest, RemoteFile};
pub use transport::{ChunkStream, RemoteResponse, ReqwestTransport, Transport, bounded_chunks};
pub use verify::{DownloadedFile, is_size_correct};
pub use writer::{ensure_download_dir, write_stream};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.

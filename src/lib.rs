//! Pudly Core Library
//!
//! Downloads files over HTTP: resolves a local filename, streams the body to
//! disk in bounded chunks, and checks the written size against what the
//! server advertised. Batches run many downloads with a bounded number in
//! flight.
//!
//! # Architecture
//!
//! - [`download`] - Transport abstraction, filename resolution, chunked
//!   writer, size verification, single and batch orchestration
//! - [`config`] - Validated tunables (chunk size, timeout, concurrency)
//!
//! Logging goes through `tracing`; the binary installs the subscriber.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, DownloaderConfig};
pub use download::{
    BatchDownloader, BatchOutcome, BatchReport, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENCY,
    DownloadError, DownloadRequest, DownloadedFile, Downloader, RemoteFile, RemoteResponse,
    ReqwestTransport, SMALL_CHUNK_SIZE, Transport, is_size_correct, resolve_name,
    resolve_name_from_url, write_stream,
};

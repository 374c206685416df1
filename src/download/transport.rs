//! HTTP transport capability used by the downloader.
//!
//! The downloader never talks to `reqwest` directly. It sees a [`Transport`]
//! that performs a GET and hands back a [`RemoteResponse`] exposing exactly
//! three things: header lookup, the resolved URL, and the body as a stream of
//! bounded chunks. [`ReqwestTransport`] is the production implementation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::error::DownloadError;
use crate::user_agent;

/// Body of a response as a finite, ordered sequence of chunks.
pub type ChunkStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// A successful (2xx) response whose body has not been read yet.
pub trait RemoteResponse: Send {
    /// Looks up a header value by case-insensitive name.
    ///
    /// Returns `None` if the header is absent or not valid visible ASCII.
    fn header(&self, name: &str) -> Option<&str>;

    /// The final URL of the response, after redirects.
    fn url(&self) -> &str;

    /// Consumes the response and yields its body in chunks of at most
    /// `chunk_size` bytes.
    fn into_chunks(self: Box<Self>, chunk_size: usize) -> ChunkStream;
}

/// Performs HTTP GET requests for the downloader.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a GET for `url` with `query` appended.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] for an invalid URL, transport failures
    /// (DNS, connection refused, timeout) and any non-2xx status.
    async fn get(
        &self,
        url: &str,
        query: &BTreeMap<String, String>,
    ) -> Result<Box<dyn RemoteResponse>, DownloadError>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
///
/// Clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport whose connect and read timeouts are both `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the client cannot be built (e.g. the
    /// TLS backend fails to initialise).
    #[instrument(level = "debug")]
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        query: &BTreeMap<String, String>,
    ) -> Result<Box<dyn RemoteResponse>, DownloadError> {
        let target = url_with_query(url, query)?;
        debug!(target = %target, "sending GET");

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        Ok(Box::new(ReqwestResponse {
            final_url: response.url().to_string(),
            request_url: url.to_string(),
            response,
        }))
    }
}

struct ReqwestResponse {
    final_url: String,
    request_url: String,
    response: reqwest::Response,
}

impl RemoteResponse for ReqwestResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    fn url(&self) -> &str {
        &self.final_url
    }

    fn into_chunks(self: Box<Self>, chunk_size: usize) -> ChunkStream {
        let Self {
            request_url,
            response,
            ..
        } = *self;
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| map_reqwest_error(&request_url, e)));
        bounded_chunks(body, chunk_size)
    }
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url, error)
    } else {
        DownloadError::network(url, error)
    }
}

/// Parses `url` and appends `query` in key order.
///
/// An empty map leaves the URL untouched (no trailing `?`).
pub(crate) fn url_with_query(
    url: &str,
    query: &BTreeMap<String, String>,
) -> Result<Url, DownloadError> {
    let mut parsed = Url::parse(url).map_err(|e| DownloadError::invalid_url(url, e))?;
    if !query.is_empty() {
        parsed.query_pairs_mut().extend_pairs(query);
    }
    Ok(parsed)
}

/// Re-slices a byte stream into chunks of exactly `chunk_size` bytes, except
/// for a shorter final chunk.
///
/// The first error ends the stream. Bytes buffered before it are dropped.
pub fn bounded_chunks<S>(inner: S, chunk_size: usize) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, DownloadError>> + Send + 'static,
{
    let chunk_size = chunk_size.max(1);
    let state = (Box::pin(inner), BytesMut::new(), false);

    stream::unfold(state, move |(mut inner, mut pending, mut done)| async move {
        loop {
            if pending.len() >= chunk_size {
                let chunk = pending.split_to(chunk_size).freeze();
                return Some((Ok(chunk), (inner, pending, done)));
            }
            if done {
                if pending.is_empty() {
                    return None;
                }
                let chunk = pending.split().freeze();
                return Some((Ok(chunk), (inner, pending, done)));
            }
            match inner.next().await {
                Some(Ok(bytes)) => pending.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    pending.clear();
                    done = true;
                    return Some((Err(e), (inner, pending, done)));
                }
                None => done = true,
            }
        }
    })
    .boxed()
}

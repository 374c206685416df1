//! In-memory [`Transport`] double.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;

use crate::download::{ChunkStream, DownloadError, RemoteResponse, Transport, bounded_chunks};

/// Canned response body and metadata.
#[derive(Debug, Clone, Default)]
pub struct FakeResponse {
    url: String,
    headers: Vec<(String, String)>,
    chunks: Vec<Bytes>,
    fail_after_chunks: Option<usize>,
}

impl FakeResponse {
    /// A response with an empty URL and the given body chunks.
    pub fn ok(chunks: &[&'static [u8]]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Bytes::from_static(c)).collect(),
            ..Self::default()
        }
    }

    /// A response whose `Content-Length` matches its body.
    pub fn sized(chunks: &[&'static [u8]]) -> Self {
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        Self::ok(chunks).with_header("content-length", &total.to_string())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    /// Makes the body fail with a network error after `count` chunks.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after_chunks = Some(count);
        self
    }
}

impl RemoteResponse for FakeResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn into_chunks(self: Box<Self>, chunk_size: usize) -> ChunkStream {
        let Self {
            url,
            chunks,
            fail_after_chunks,
            ..
        } = *self;
        let mut items: Vec<Result<Bytes, DownloadError>> = chunks
            .into_iter()
            .take(fail_after_chunks.unwrap_or(usize::MAX))
            .map(Ok)
            .collect();
        if fail_after_chunks.is_some() {
            let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
            items.push(Err(DownloadError::network(url, cause)));
        }
        bounded_chunks(stream::iter(items), chunk_size)
    }
}

/// How the fake answers one URL.
#[derive(Debug, Clone)]
pub enum Route {
    Respond(FakeResponse),
    Status(u16),
    ConnectionRefused,
    Timeout,
    /// The `get` call panics, killing the task running it.
    Panic,
}

/// [`Transport`] answering from a fixed route table.
///
/// Unknown URLs get a 404. Every call is recorded, and the highest number of
/// concurrent `get` calls is tracked.
#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: HashMap<String, Route>,
    latency: Duration,
    url_latency: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, BTreeMap<String, String>)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, route: Route) -> Self {
        self.routes.insert(url.to_string(), route);
        self
    }

    pub fn respond(self, url: &str, response: FakeResponse) -> Self {
        self.route(url, Route::Respond(response))
    }

    /// Delays every response so concurrent calls overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Delays responses for `url` only, overriding [`with_latency`](Self::with_latency).
    pub fn with_url_latency(mut self, url: &str, latency: Duration) -> Self {
        self.url_latency.insert(url.to_string(), latency);
        self
    }

    #[allow(clippy::unwrap_used)]
    pub fn calls(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// `get` calls currently running. Cancelled calls count as finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter when a `get` call ends or is dropped.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    #[allow(clippy::unwrap_used)]
    async fn get(
        &self,
        url: &str,
        query: &BTreeMap<String, String>,
    ) -> Result<Box<dyn RemoteResponse>, DownloadError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), query.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlightGuard(&self.in_flight);
        let latency = self.url_latency.get(url).copied().unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        drop(guard);

        match self.routes.get(url).cloned().unwrap_or(Route::Status(404)) {
            Route::Respond(response) => Ok(Box::new(response)),
            Route::Status(status) => Err(DownloadError::http_status(url, status)),
            Route::ConnectionRefused => {
                let cause =
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
                Err(DownloadError::network(url, cause))
            }
            Route::Panic => panic!("transport blew up for {url}"),
            Route::Timeout => Err(DownloadError::timeout(
                url,
                std::io::Error::from(std::io::ErrorKind::TimedOut),
            )),
        }
    }
}

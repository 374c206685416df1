//! Bounded-concurrency batch downloads.
//!
//! [`BatchDownloader`] runs one [`Downloader::download`] per URL as its own
//! Tokio task. A semaphore caps how many run at once; results are collected
//! in completion order, not input order.
//!
//! Two policies are offered:
//!
//! - [`download_all`](BatchDownloader::download_all) stops at the first
//!   failure, aborts the siblings still running, waits for them to wind down
//!   and returns the error. Partially written files of aborted siblings are
//!   left on disk.
//! - [`download_all_settled`](BatchDownloader::download_all_settled) lets every
//!   download finish and reports one outcome per URL.
//!
//! Within a batch the first download to resolve a destination path owns it;
//! any later download resolving the same path fails with
//! [`DownloadError::DuplicateTarget`] before touching the file.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, instrument, warn};

use super::client::Downloader;
use super::constants::DEFAULT_MAX_CONCURRENCY;
use super::error::DownloadError;
use super::model::DownloadRequest;
use crate::config::{ConfigError, validate_concurrency};

/// Destination paths already taken by downloads of one batch.
#[derive(Debug, Default)]
pub(crate) struct TargetClaims {
    taken: Mutex<HashSet<PathBuf>>,
}

impl TargetClaims {
    /// Records `path` as taken. Returns false if it already was.
    pub(crate) fn claim(&self, path: &Path) -> bool {
        self.taken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf())
    }
}

type BatchTasks = JoinSet<(usize, Result<PathBuf, DownloadError>)>;

/// Result of one URL in a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// The URL as given.
    pub url: String,
    /// Saved path, or why the download failed.
    pub result: Result<PathBuf, DownloadError>,
}

/// Every outcome of a settled batch, in completion order.
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    /// All outcomes, in the order downloads finished.
    #[must_use]
    pub fn outcomes(&self) -> &[BatchOutcome] {
        &self.outcomes
    }

    /// Paths of the successful downloads.
    pub fn completed(&self) -> impl Iterator<Item = &Path> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().map(PathBuf::as_path))
    }

    /// URLs and errors of the failed downloads.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &DownloadError)> {
        self.outcomes.iter().filter_map(|outcome| {
            outcome
                .result
                .as_ref()
                .err()
                .map(|error| (outcome.url.as_str(), error))
        })
    }

    /// Number of successful downloads.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed().count()
    }

    /// Number of failed downloads.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// True when every download succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Collapses the report into the paths, or the first failure in
    /// completion order.
    ///
    /// # Errors
    ///
    /// Returns the first [`DownloadError`] in the report.
    pub fn into_result(self) -> Result<Vec<PathBuf>, DownloadError> {
        self.outcomes
            .into_iter()
            .map(|outcome| outcome.result)
            .collect()
    }
}

/// Downloads many URLs with at most `max_concurrency` in flight.
#[derive(Debug, Clone)]
pub struct BatchDownloader {
    downloader: Downloader,
    max_concurrency: usize,
}

impl BatchDownloader {
    /// Creates a batch downloader.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConcurrency`] if `max_concurrency` is
    /// outside 1..=100.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pudly::{BatchDownloader, Downloader};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let batch = BatchDownloader::new(Downloader::new()?, 3)?;
    /// let urls = ["https://example.com/a.csv", "https://example.com/b.csv"];
    /// let paths = batch.download_all(urls, &Default::default(), None).await?;
    /// assert_eq!(paths.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(level = "debug", skip(downloader))]
    pub fn new(downloader: Downloader, max_concurrency: usize) -> Result<Self, ConfigError> {
        validate_concurrency(max_concurrency)?;
        debug!(max_concurrency, "creating batch downloader");
        Ok(Self {
            downloader,
            max_concurrency,
        })
    }

    /// Creates a batch downloader running five downloads at once.
    #[must_use]
    pub fn with_default_concurrency(downloader: Downloader) -> Self {
        Self {
            downloader,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Configured concurrency limit.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Downloads every URL and returns the saved paths in completion order.
    ///
    /// # Errors
    ///
    /// Returns the first [`DownloadError`] to complete. Downloads still in
    /// flight at that point are aborted.
    #[instrument(skip_all, fields(max_concurrency = self.max_concurrency))]
    pub async fn download_all<I, S>(
        &self,
        urls: I,
        query_parameters: &BTreeMap<String, String>,
        download_dir: Option<&Path>,
    ) -> Result<Vec<PathBuf>, DownloadError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requests = build_requests(urls, query_parameters, download_dir);
        let urls: Vec<String> = requests.iter().map(|r| r.url.clone()).collect();
        info!(total = urls.len(), "starting batch download");

        let (mut tasks, task_indices) = self.spawn_all(requests);
        let mut paths = Vec::with_capacity(urls.len());

        while let Some(joined) = tasks.join_next_with_id().await {
            let result = match joined {
                Ok((_, (_, result))) => result,
                Err(join_error) => {
                    let url = task_indices
                        .get(&join_error.id())
                        .and_then(|index| urls.get(*index))
                        .map_or("<unknown>", String::as_str);
                    warn!(url, error = %join_error, "download task panicked");
                    Err(DownloadError::task_failed(url, join_error.to_string()))
                }
            };
            match result {
                Ok(path) => paths.push(path),
                Err(error) => {
                    warn!(
                        error = %error,
                        remaining = tasks.len(),
                        "download failed; aborting the rest of the batch"
                    );
                    tasks.shutdown().await;
                    return Err(error);
                }
            }
        }

        info!(completed = paths.len(), "batch download complete");
        Ok(paths)
    }

    /// Downloads every URL, letting each finish, and reports all outcomes.
    #[instrument(skip_all, fields(max_concurrency = self.max_concurrency))]
    pub async fn download_all_settled<I, S>(
        &self,
        urls: I,
        query_parameters: &BTreeMap<String, String>,
        download_dir: Option<&Path>,
    ) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requests = build_requests(urls, query_parameters, download_dir);
        let urls: Vec<String> = requests.iter().map(|r| r.url.clone()).collect();
        info!(total = urls.len(), "starting batch download");

        let (mut tasks, task_indices) = self.spawn_all(requests);
        let mut seen = vec![false; urls.len()];
        let mut report = BatchReport::default();

        while let Some(joined) = tasks.join_next_with_id().await {
            let (index, result) = match joined {
                Ok((_, outcome)) => outcome,
                Err(join_error) => {
                    let Some(&index) = task_indices.get(&join_error.id()) else {
                        warn!(error = %join_error, "untracked download task failed");
                        continue;
                    };
                    warn!(url = %urls[index], error = %join_error, "download task panicked");
                    let reason = join_error.to_string();
                    (index, Err(DownloadError::task_failed(urls[index].as_str(), reason)))
                }
            };
            seen[index] = true;
            if let Err(error) = &result {
                warn!(url = %urls[index], error = %error, "download failed");
            }
            report.outcomes.push(BatchOutcome {
                url: urls[index].clone(),
                result,
            });
        }

        for (index, url) in urls.iter().enumerate().filter(|(index, _)| !seen[*index]) {
            report.outcomes.push(BatchOutcome {
                url: url.clone(),
                result: Err(DownloadError::task_failed(
                    url.as_str(),
                    format!("task {index} panicked or was cancelled"),
                )),
            });
        }

        info!(
            completed = report.completed_count(),
            failed = report.failed_count(),
            "batch download complete"
        );
        report
    }

    /// Spawns one task per request. Each task holds a semaphore permit for the
    /// whole download and returns its request index with the result. The map
    /// gives the request index of each task id, for tasks that end without
    /// returning.
    fn spawn_all(&self, requests: Vec<DownloadRequest>) -> (BatchTasks, HashMap<task::Id, usize>) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let claims = Arc::new(TargetClaims::default());
        let mut tasks = JoinSet::new();
        let mut task_indices = HashMap::with_capacity(requests.len());

        for (index, request) in requests.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let claims = Arc::clone(&claims);
            let downloader = self.downloader.clone();

            let handle = tasks.spawn(async move {
                // Only fails once the semaphore is closed, which this batch never does
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (
                        index,
                        Err(DownloadError::task_failed(request.url, "semaphore closed")),
                    );
                };
                debug!(index, url = %request.url, "download slot acquired");
                let result = downloader
                    .download_claiming(&request, Some(claims.as_ref()))
                    .await;
                (index, result)
            });
            task_indices.insert(handle.id(), index);
        }

        debug!(task_count = tasks.len(), "downloads scheduled");
        (tasks, task_indices)
    }
}

fn build_requests<I, S>(
    urls: I,
    query_parameters: &BTreeMap<String, String>,
    download_dir: Option<&Path>,
) -> Vec<DownloadRequest>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    urls.into_iter()
        .map(|url| {
            let request =
                DownloadRequest::new(url).with_query_parameters(query_parameters.clone());
            match download_dir {
                Some(dir) => request.with_download_dir(dir),
                None => request,
            }
        })
        .collect()
}

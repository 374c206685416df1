//! Request and response-metadata types for a single download.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};

use super::filename::{resolve_name, timestamp_filename};
use super::transport::RemoteResponse;

/// What to download and where to put it.
///
/// # Example
///
/// ```
/// use pudly::DownloadRequest;
///
/// let request = DownloadRequest::new("https://example.com/report.csv")
///     .with_query_parameter("year", "2024")
///     .with_download_dir("data");
/// assert_eq!(request.url, "https://example.com/report.csv");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadRequest {
    /// URL to GET.
    pub url: String,
    /// Query parameters appended to the URL.
    pub query_parameters: BTreeMap<String, String>,
    /// Directory to save into; `None` means the current working directory.
    pub download_dir: Option<PathBuf>,
}

impl DownloadRequest {
    /// Creates a request for `url` with no query parameters, saving into the
    /// current working directory.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Adds one query parameter.
    #[must_use]
    pub fn with_query_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_parameters.insert(key.into(), value.into());
        self
    }

    /// Replaces all query parameters.
    #[must_use]
    pub fn with_query_parameters(mut self, query_parameters: BTreeMap<String, String>) -> Self {
        self.query_parameters = query_parameters;
        self
    }

    /// Sets the directory to save into.
    #[must_use]
    pub fn with_download_dir(mut self, download_dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(download_dir.into());
        self
    }

    /// Where a file named `name` ends up for this request.
    #[must_use]
    pub fn destination_for(&self, name: &str) -> PathBuf {
        match &self.download_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// Metadata of the file behind a response, captured before the body is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    url: String,
    total_size_bytes: u64,
    resolved_name: String,
}

impl RemoteFile {
    /// Reads size and name from `response`.
    ///
    /// `total_size_bytes` is the `Content-Length` value, or 0 when absent or
    /// not a number. The name comes from
    /// [`resolve_name`](super::filename::resolve_name), falling back to
    /// `download_<unix-secs><ext>` if every source is empty.
    #[must_use]
    pub fn from_response(response: &dyn RemoteResponse, request_url: &str) -> Self {
        let total_size_bytes = response
            .header(CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);

        let mut resolved_name = resolve_name(
            response.header(CONTENT_DISPOSITION.as_str()),
            response.url(),
            request_url,
        );
        if resolved_name.is_empty() {
            resolved_name = timestamp_filename(response.header(CONTENT_TYPE.as_str()));
        }

        Self {
            url: response.url().to_string(),
            total_size_bytes,
            resolved_name,
        }
    }

    /// Final URL after redirects.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Advertised size; 0 means unknown.
    #[must_use]
    pub fn total_size_bytes(&self) -> u64 {
        self.total_size_bytes
    }

    /// Local filename, never empty and free of directory separators.
    #[must_use]
    pub fn resolved_name(&self) -> &str {
        &self.resolved_name
    }

    /// `resolved_name` as a relative path.
    #[must_use]
    pub fn name_path(&self) -> &Path {
        Path::new(&self.resolved_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fake::FakeResponse;

    #[test]
    fn test_destination_for_without_download_dir_is_bare_name() {
        let request = DownloadRequest::new("https://example.com/a.bin");
        assert_eq!(request.destination_for("a.bin"), PathBuf::from("a.bin"));
    }

    #[test]
    fn test_destination_for_prefixes_download_dir() {
        let request = DownloadRequest::new("https://example.com/a.bin").with_download_dir("data");
        assert_eq!(
            request.destination_for("a.bin"),
            PathBuf::from("data").join("a.bin")
        );
    }

    #[test]
    fn test_remote_file_reads_content_length() {
        let response = FakeResponse::ok(&[b"12345"]).with_header("Content-Length", "5");
        let file = RemoteFile::from_response(&response, "https://example.com/a.bin");
        assert_eq!(file.total_size_bytes(), 5);
        assert_eq!(file.resolved_name(), "a.bin");
    }

    #[test]
    fn test_remote_file_non_numeric_content_length_is_unknown() {
        let response = FakeResponse::ok(&[]).with_header("content-length", "lots");
        let file = RemoteFile::from_response(&response, "https://example.com/a.bin");
        assert_eq!(file.total_size_bytes(), 0);
    }

    #[test]
    fn test_remote_file_header_name_beats_request_url() {
        let response = FakeResponse::ok(&[]).with_header("content-disposition", "filename=x.txt");
        let file = RemoteFile::from_response(&response, "https://example.com/a.bin");
        assert_eq!(file.resolved_name(), "x.txt");
    }

    #[test]
    fn test_remote_file_uses_redirected_url() {
        let response = FakeResponse::ok(&[]).with_url("https://cdn.example.com/real.zip");
        let file = RemoteFile::from_response(&response, "https://example.com/latest");
        assert_eq!(file.resolved_name(), "real.zip");
        assert_eq!(file.url(), "https://cdn.example.com/real.zip");
    }

    #[test]
    fn test_remote_file_dot_dot_url_gets_timestamp_name() {
        let response = FakeResponse::ok(&[]).with_url("https://example.com/");
        let file = RemoteFile::from_response(&response, "https://example.com/a/..");
        assert!(file.resolved_name().starts_with("download_"));
        assert!(file.resolved_name().ends_with(".bin"));
    }

    #[test]
    fn test_remote_file_name_is_never_empty() {
        let response = FakeResponse::ok(&[])
            .with_url("https://example.com/")
            .with_header("content-type", "application/pdf");
        let file = RemoteFile::from_response(&response, "https://example.com/");
        assert!(file.resolved_name().starts_with("download_"));
        assert!(file.resolved_name().ends_with(".pdf"));
    }
}

//! Filename resolution for downloads.
//!
//! A local name is picked through ordered attempts, each returning an
//! `Option`; the first hit wins:
//!
//! 1. `Content-Disposition` header (`filename*=` then `filename=`)
//! 2. Final path segment of the response URL (after redirects)
//! 3. Final path segment of the URL that was requested
//!
//! None of these steps fail loudly. [`RemoteFile`](super::RemoteFile) adds a
//! timestamp name as the last resort so a resolved name is never empty.

/// Extracts the filename suggested by a `Content-Disposition` header.
///
/// Handles:
/// - `filename=example.pdf`
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename*=UTF-8''example%20file.pdf` (RFC 5987)
///
/// Directory components are stripped. Returns `None` when the header carries
/// no filename token or the name is empty, `.` or `..`.
#[must_use]
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    extended_filename(header)
        .and_then(|name| strip_directories(&name))
        .or_else(|| plain_filename(header).and_then(|name| strip_directories(&name)))
}

/// Derives a filename from a URL string.
///
/// Strips, in order, the fragment, the query string, the scheme and host
/// prefix (up to `://` and any `host:` or `:port` segment), then returns the
/// last path segment. Every step is a no-op when its part is absent, so
/// `a.com/download/b.pdf` and `https://a.com/b.pdf?c=d#e` both give `b.pdf`.
///
/// A URL ending in `/` gives an empty string.
#[must_use]
pub fn resolve_name_from_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    let without_scheme = without_query.rsplit("://").next().unwrap_or_default();
    let without_host_port = without_scheme.rsplit(':').next().unwrap_or_default();
    without_host_port
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Resolves the local filename for a response.
///
/// `content_disposition` is the raw header value if the response had one.
/// `response_url` is the final URL after redirects. `request_url` is what the
/// caller asked for and only matters when the other two give nothing.
///
/// URL segments that are empty, `.` or `..` are skipped like a missing
/// header. Returns an empty string only when no source gives a usable name.
#[must_use]
pub fn resolve_name(
    content_disposition: Option<&str>,
    response_url: &str,
    request_url: &str,
) -> String {
    content_disposition
        .and_then(filename_from_content_disposition)
        .or_else(|| usable_name(&resolve_name_from_url(response_url)))
        .or_else(|| usable_name(&resolve_name_from_url(request_url)))
        .unwrap_or_default()
}

/// Guesses a file extension from a `Content-Type` header.
pub(crate) fn extension_from_content_type(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    match mime.as_str() {
        "text/html" => ".html",
        "text/plain" => ".txt",
        "text/csv" => ".csv",
        "application/json" => ".json",
        "application/xml" | "text/xml" => ".xml",
        "application/pdf" => ".pdf",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "application/zip" => ".zip",
        "application/gzip" => ".gz",
        "video/mp4" => ".mp4",
        "audio/mpeg" => ".mp3",
        _ => ".bin",
    }
}

/// Builds the last-resort name `download_<unix-secs><ext>`.
pub(crate) fn timestamp_filename(content_type: Option<&str>) -> String {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let extension = content_type.map_or(".bin", extension_from_content_type);
    format!("download_{timestamp}{extension}")
}

fn extended_filename(header: &str) -> Option<String> {
    let (_, value) = header.split_once("filename*=")?;
    // charset'language'encoded_value
    let (_, encoded) = value.trim().split_once("''")?;
    let encoded = encoded.split(';').next().unwrap_or_default().trim();
    urlencoding::decode(encoded)
        .ok()
        .map(std::borrow::Cow::into_owned)
        .filter(|name| !name.is_empty())
}

fn plain_filename(header: &str) -> Option<String> {
    let (_, value) = header.split_once("filename=")?;
    let value = value.trim();
    let name = match value.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().unwrap_or_default(),
        None => value.split(';').next().unwrap_or_default().trim(),
    };
    (!name.is_empty()).then(|| name.to_string())
}

fn strip_directories(name: &str) -> Option<String> {
    usable_name(name.rsplit(['/', '\\']).next().unwrap_or_default())
}

/// `None` for names that cannot be a file: empty, `.` or `..`.
fn usable_name(name: &str) -> Option<String> {
    match name.trim() {
        "" | "." | ".." => None,
        segment => Some(segment.to_string()),
    }
}

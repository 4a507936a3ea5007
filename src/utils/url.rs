//! URL utilities for building API endpoints
//!
//! Base URLs come from user configuration, so trailing slashes and sub-paths
//! (`http://host/api/`) are normal. Path segments such as file ids are
//! percent-encoded rather than spliced into the string.

use std::error::Error as StdError;
use std::fmt;

use reqwest::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlError {
    pub base_url: String,
    pub reason: String,
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid API base URL '{}': {}", self.base_url, self.reason)
    }
}

impl StdError for UrlError {}

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use policychat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000/api///"), "http://localhost:8000/api");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Build an endpoint URL by appending each segment to the base URL's path.
///
/// # Examples
///
/// ```
/// use policychat::utils::url::endpoint_url;
///
/// let url = endpoint_url("http://localhost:8000/", &["files", "a b"]).unwrap();
/// assert_eq!(url.as_str(), "http://localhost:8000/files/a%20b");
/// ```
pub fn endpoint_url(base_url: &str, segments: &[&str]) -> Result<Url, UrlError> {
    let normalized = normalize_base_url(base_url);
    let error = |reason: String| UrlError {
        base_url: base_url.to_string(),
        reason,
    };

    let mut url = Url::parse(&normalized).map_err(|err| error(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(error(format!("unsupported scheme '{}'", url.scheme())));
    }

    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| error("URL cannot have path segments".to_string()))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }

    Ok(url)
}

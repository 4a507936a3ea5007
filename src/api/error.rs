use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use reqwest::StatusCode;

use crate::utils::url::UrlError;

/// Failures surfaced by the remote API client.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be sent or the body could not be read.
    Transport(reqwest::Error),

    /// The server answered with a non-success status.
    Status {
        status: StatusCode,
        /// Human-readable summary of the response body.
        detail: String,
    },

    /// The response body was not the JSON we expected.
    Decode(serde_json::Error),

    /// A local file needed for the request could not be read.
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configured base URL cannot be used to build an endpoint.
    Url(UrlError),

    /// A lower-level I/O failure while reading a response stream.
    Io(std::io::Error),
}

impl ApiError {
    pub fn status(status: StatusCode, body: &str) -> Self {
        ApiError::Status {
            status,
            detail: summarize_error_body(body),
        }
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(err) => write!(f, "request failed: {err}"),
            ApiError::Status { status, detail } if detail.is_empty() => {
                write!(f, "server returned {status}")
            }
            ApiError::Status { status, detail } => {
                write!(f, "server returned {status}: {detail}")
            }
            ApiError::Decode(err) => write!(f, "unexpected response body: {err}"),
            ApiError::ReadFile { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ApiError::Url(err) => write!(f, "{err}"),
            ApiError::Io(err) => write!(f, "stream read failed: {err}"),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Transport(err) => Some(err),
            ApiError::Status { .. } => None,
            ApiError::Decode(err) => Some(err),
            ApiError::ReadFile { source, .. } => Some(source),
            ApiError::Url(err) => Some(err),
            ApiError::Io(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err)
    }
}

impl From<UrlError> for ApiError {
    fn from(err: UrlError) -> Self {
        ApiError::Url(err)
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .get("detail")
        .and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            // Validation failures arrive as a list of {loc, msg, type}.
            serde_json::Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        })
        .or_else(|| {
            value
                .pointer("/error/message")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Condenses an error response body into a single line.
pub fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return summary;
            }
        }
        return json_value.to_string();
    }

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! Wire payloads and backend seams for the policy assistant HTTP API.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub mod client;
pub mod context;
pub mod error;

pub use client::HttpApi;
pub use context::{ApiContext, Credential};
pub use error::ApiError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub question: String,
    /// Conversation so far, excluding the message being asked.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct BlockingChatResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FileRecord {
    #[serde(rename = "file_id")]
    pub id: String,
    pub filename: String,
    /// Upload timestamp exactly as the server reported it.
    pub upload_date: String,
}

impl FileRecord {
    /// Parses `upload_date`, accepting naive ISO-8601, RFC 3339 and bare dates.
    pub fn uploaded_at(&self) -> Option<NaiveDateTime> {
        let raw = self.upload_date.trim();
        if raw.is_empty() {
            return None;
        }

        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    }
}

/// Raw response body chunks, in arrival order.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ApiError>>;

/// Remote file storage used by [`crate::core::files::FileStore`].
#[async_trait]
pub trait FilesBackend: Send + Sync {
    async fn list_files(&self, ctx: &ApiContext) -> Result<Vec<FileRecord>, ApiError>;

    async fn delete_file(&self, ctx: &ApiContext, file_id: &str) -> Result<(), ApiError>;

    async fn upload_file(&self, ctx: &ApiContext, path: &Path) -> Result<FileRecord, ApiError>;
}

/// Remote inference endpoint used by [`crate::core::chat::ChatStore`].
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends the request and resolves once response headers arrive with a
    /// success status. The returned stream yields the reply body.
    async fn open_chat(&self, ctx: &ApiContext, request: &ChatRequest)
        -> Result<ByteStream, ApiError>;
}

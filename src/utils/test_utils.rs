use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use tokio::sync::mpsc;

use crate::api::{
    ApiContext, ApiError, ByteStream, ChatBackend, ChatRequest, Credential, FileRecord,
    FilesBackend,
};

pub fn test_context() -> ApiContext {
    ApiContext::new("http://policy.test", Credential::new("test-key"))
}

pub fn file_record(id: &str, filename: &str) -> FileRecord {
    FileRecord {
        id: id.to_string(),
        filename: filename.to_string(),
        upload_date: "2024-01-15T09:30:00".to_string(),
    }
}

pub fn io_error(message: &str) -> ApiError {
    ApiError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        message.to_string(),
    ))
}

pub fn server_error() -> ApiError {
    ApiError::status(
        reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"detail":"boom"}"#,
    )
}

/// One scripted reply for [`ScriptedChatBackend`].
pub enum ScriptedReply {
    Chunks(Vec<Result<Vec<u8>, ApiError>>),
    /// Chunks are fed by the test through the paired sender.
    Channel(mpsc::UnboundedReceiver<Result<Vec<u8>, ApiError>>),
    Fail(ApiError),
    /// Response headers never arrive.
    Stall,
}

impl ScriptedReply {
    pub fn text_chunks(chunks: &[&str]) -> Self {
        ScriptedReply::Chunks(chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect())
    }

    pub fn channel() -> (mpsc::UnboundedSender<Result<Vec<u8>, ApiError>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, ScriptedReply::Channel(rx))
    }
}

#[derive(Default)]
pub struct ScriptedChatBackend {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<(ApiContext, ChatRequest)>>,
}

impl ScriptedChatBackend {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(ApiContext, ChatRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedChatBackend {
    async fn open_chat(
        &self,
        ctx: &ApiContext,
        request: &ChatRequest,
    ) -> Result<ByteStream, ApiError> {
        self.requests
            .lock()
            .unwrap()
            .push((ctx.clone(), request.clone()));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left");
        match reply {
            ScriptedReply::Chunks(chunks) => Ok(stream::iter(chunks).boxed()),
            ScriptedReply::Channel(rx) => Ok(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
            ScriptedReply::Fail(err) => Err(err),
            ScriptedReply::Stall => std::future::pending().await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCall {
    List,
    Delete(String),
    Upload(PathBuf),
}

/// In-memory file backend that records calls in order.
#[derive(Default)]
pub struct RecordingFilesBackend {
    list_results: Mutex<VecDeque<Result<Vec<FileRecord>, ApiError>>>,
    delete_results: Mutex<VecDeque<Result<(), ApiError>>>,
    upload_results: Mutex<VecDeque<Result<FileRecord, ApiError>>>,
    calls: Mutex<Vec<FileCall>>,
}

impl RecordingFilesBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_list(&self, result: Result<Vec<FileRecord>, ApiError>) {
        self.list_results.lock().unwrap().push_back(result);
    }

    pub fn push_delete(&self, result: Result<(), ApiError>) {
        self.delete_results.lock().unwrap().push_back(result);
    }

    pub fn push_upload(&self, result: Result<FileRecord, ApiError>) {
        self.upload_results.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<FileCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FilesBackend for RecordingFilesBackend {
    async fn list_files(&self, _ctx: &ApiContext) -> Result<Vec<FileRecord>, ApiError> {
        self.calls.lock().unwrap().push(FileCall::List);
        self.list_results
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted list result")
    }

    async fn delete_file(&self, _ctx: &ApiContext, file_id: &str) -> Result<(), ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(FileCall::Delete(file_id.to_string()));
        self.delete_results
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted delete result")
    }

    async fn upload_file(&self, _ctx: &ApiContext, path: &Path) -> Result<FileRecord, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(FileCall::Upload(path.to_path_buf()));
        self.upload_results
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted upload result")
    }
}

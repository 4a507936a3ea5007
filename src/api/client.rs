//! reqwest-backed implementation of the file and chat backends.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    ApiContext, ApiError, BlockingChatResponse, ByteStream, ChatBackend, ChatRequest,
    FileRecord, FilesBackend,
};
use crate::utils::auth::add_api_key_header;
use crate::utils::url::endpoint_url;

#[derive(Clone, Debug)]
pub struct HttpApi {
    client: reqwest::Client,
}

impl HttpApi {
    /// Builds a client with a connect timeout. No overall request timeout is
    /// set because chat replies stream for as long as the model keeps talking;
    /// idle streams are bounded by the chat store instead.
    pub fn new(connect_timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Non-streaming variant of the chat endpoint.
    pub async fn chat_blocking(
        &self,
        ctx: &ApiContext,
        request: &ChatRequest,
    ) -> Result<String, ApiError> {
        let url = endpoint_url(&ctx.base_url, &["chat", "blocking"])?;
        debug!(%url, history = request.history.len(), "sending blocking chat request");

        let response = add_api_key_header(self.client.post(url), &ctx.credential)
            .json(request)
            .send()
            .await?;
        let body: BlockingChatResponse = read_json(ensure_success(response).await?).await?;
        Ok(body.answer)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(ApiError::status(status, &body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl FilesBackend for HttpApi {
    async fn list_files(&self, ctx: &ApiContext) -> Result<Vec<FileRecord>, ApiError> {
        let url = endpoint_url(&ctx.base_url, &["files"])?;
        debug!(%url, "listing files");

        let response = add_api_key_header(self.client.get(url), &ctx.credential)
            .send()
            .await?;
        read_json(ensure_success(response).await?).await
    }

    async fn delete_file(&self, ctx: &ApiContext, file_id: &str) -> Result<(), ApiError> {
        let url = endpoint_url(&ctx.base_url, &["files", file_id])?;
        debug!(%url, "deleting file");

        let response = add_api_key_header(self.client.delete(url), &ctx.credential)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn upload_file(&self, ctx: &ApiContext, path: &Path) -> Result<FileRecord, ApiError> {
        let url = endpoint_url(&ctx.base_url, &["upload"])?;
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| ApiError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        debug!(%url, %filename, bytes = data.len(), "uploading file");

        let form = Form::new().part("file", Part::bytes(data).file_name(filename));
        let response = add_api_key_header(self.client.post(url), &ctx.credential)
            .multipart(form)
            .send()
            .await?;
        read_json(ensure_success(response).await?).await
    }
}

#[async_trait]
impl ChatBackend for HttpApi {
    async fn open_chat(
        &self,
        ctx: &ApiContext,
        request: &ChatRequest,
    ) -> Result<ByteStream, ApiError> {
        let url = endpoint_url(&ctx.base_url, &["chat"])?;
        debug!(%url, history = request.history.len(), "opening chat stream");

        let response = add_api_key_header(self.client.post(url), &ctx.credential)
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ApiError::from))
            .boxed())
    }
}

#[cfg(test)]
mod tests;

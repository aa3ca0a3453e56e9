//! HTTP remote store.
//!
//! Async client for the two store endpoints using `reqwest`:
//! `POST /files` with a JSON body and `PUT /uploads/{signature}` with a
//! multipart form per chunk.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chunkup_protocol::constants::{
    CHUNK_CONTENT_TYPE, CHUNK_FILE_NAME, FIELD_CHUNK, FILES_PATH, upload_path,
};
use chunkup_protocol::{FileMetadata, FileStatusResponse, ServerUploadState, UploadAck};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::StoreError;
use crate::store::{ChunkUpload, RemoteStore};

/// Remote store reached over HTTP.
pub struct HttpStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    /// Creates a store for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Creates a store sharing an existing HTTP client.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the body of a successful response.
    async fn success_body(resp: reqwest::Response) -> Result<Vec<u8>, StoreError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn post_file(&self, metadata: &FileMetadata) -> Result<ServerUploadState, StoreError> {
        let url = format!("{}{FILES_PATH}", self.base_url);
        let resp = self.http.post(&url).json(metadata).send().await?;
        let body = Self::success_body(resp).await?;
        let state = FileStatusResponse::from_slice(&body)?.into_state(metadata)?;
        debug!(
            uploaded_chunks = state.uploaded_chunks,
            exists = state.exists,
            "file status"
        );
        Ok(state)
    }

    async fn put_chunk(&self, upload: ChunkUpload<'_>) -> Result<UploadAck, StoreError> {
        let url = format!("{}{}", self.base_url, upload_path(upload.file_signature));
        let [signature, position, size] = upload.fields().to_pairs();

        let chunk = Part::bytes(upload.data.to_vec())
            .file_name(CHUNK_FILE_NAME)
            .mime_str(CHUNK_CONTENT_TYPE)?;
        let form = Form::new()
            .text(signature.0, signature.1)
            .text(position.0, position.1)
            .part(FIELD_CHUNK, chunk)
            .text(size.0, size.1);

        let resp = self.http.put(&url).multipart(form).send().await?;
        let body = Self::success_body(resp).await?;
        Ok(UploadAck::from_slice(&body)?)
    }
}

impl RemoteStore for HttpStore {
    fn query_progress<'a>(
        &'a self,
        metadata: &'a FileMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<ServerUploadState, StoreError>> + Send + 'a>> {
        Box::pin(self.post_file(metadata))
    }

    fn upload_chunk<'a>(
        &'a self,
        upload: ChunkUpload<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<UploadAck, StoreError>> + Send + 'a>> {
        Box::pin(self.put_chunk(upload))
    }
}

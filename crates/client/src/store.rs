//! Remote store trait.
//!
//! `RemoteStore` is implemented by [`HttpStore`](crate::http::HttpStore) for
//! the real endpoints. Keeping the pipeline behind a trait decouples it from
//! the transport and makes it testable with mocks.

use std::future::Future;
use std::pin::Pin;

use chunkup_protocol::{ChunkFields, FileMetadata, ServerUploadState, UploadAck};

use crate::error::StoreError;

/// One chunk upload request.
#[derive(Debug, Clone, Copy)]
pub struct ChunkUpload<'a> {
    /// Whole-file signature; addresses the upload on the store.
    pub file_signature: &'a str,
    /// Signature of `data`.
    pub chunk_signature: &'a str,
    /// Zero-based chunk index.
    pub index: u64,
    /// Byte offset one past the chunk's last byte.
    pub end_offset: u64,
    /// Raw chunk bytes.
    pub data: &'a [u8],
}

impl ChunkUpload<'_> {
    /// Multipart text fields for this chunk.
    pub fn fields(&self) -> ChunkFields {
        ChunkFields {
            signature: self.chunk_signature.to_string(),
            position: self.index,
            size: self.end_offset,
        }
    }
}

/// Abstract remote store holding uploaded chunks.
pub trait RemoteStore: Send + Sync {
    /// Registers the file (if new) and returns how much of it is stored.
    ///
    /// Implementations validate the response schema before returning.
    fn query_progress<'a>(
        &'a self,
        metadata: &'a FileMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<ServerUploadState, StoreError>> + Send + 'a>>;

    /// Transmits one chunk and returns the store's acknowledgement.
    fn upload_chunk<'a>(
        &'a self,
        upload: ChunkUpload<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<UploadAck, StoreError>> + Send + 'a>>;
}

//! In-memory remote store for pipeline and client tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chunkup_protocol::{FileMetadata, ServerUploadState, UploadAck};

use crate::error::StoreError;
use crate::store::{ChunkUpload, RemoteStore};

/// A chunk upload as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedChunk {
    pub file_signature: String,
    pub chunk_signature: String,
    pub index: u64,
    pub end_offset: u64,
    pub data: Vec<u8>,
}

/// Scripted failure for one chunk index.
struct ChunkFailure {
    remaining: u32,
    transient: bool,
    /// The chunk is stored before the error is returned.
    lands: bool,
}

fn service_unavailable() -> StoreError {
    StoreError::Status {
        status: 503,
        body: "Service Unavailable".into(),
    }
}

pub(crate) struct MockStore {
    uploaded_chunks: Mutex<u64>,
    fail_queries: AtomicBool,
    failures: Mutex<HashMap<u64, ChunkFailure>>,
    chunks: Mutex<Vec<RecordedChunk>>,
    attempts: AtomicUsize,
    queries: AtomicUsize,
}

impl MockStore {
    /// Creates a store that already holds `uploaded_chunks` chunks.
    pub fn new(uploaded_chunks: u64) -> Self {
        Self {
            uploaded_chunks: Mutex::new(uploaded_chunks),
            fail_queries: AtomicBool::new(false),
            failures: Mutex::new(HashMap::new()),
            chunks: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    /// Makes every progress query fail.
    pub fn fail_queries(&self) {
        self.fail_queries.store(true, Ordering::SeqCst);
    }

    /// Makes the next `times` attempts at chunk `index` fail.
    pub fn fail_chunk(&self, index: u64, times: u32, transient: bool) {
        self.failures.lock().unwrap().insert(
            index,
            ChunkFailure {
                remaining: times,
                transient,
                lands: false,
            },
        );
    }

    /// Stores the next `times` attempts at chunk `index`, then fails them
    /// with a transient error, as if the response was lost.
    pub fn lose_ack(&self, index: u64, times: u32) {
        self.failures.lock().unwrap().insert(
            index,
            ChunkFailure {
                remaining: times,
                transient: true,
                lands: true,
            },
        );
    }

    /// Chunks the store accepted, in arrival order.
    pub fn chunks(&self) -> Vec<RecordedChunk> {
        self.chunks.lock().unwrap().clone()
    }

    /// Indices the store accepted, in arrival order.
    pub fn indices(&self) -> Vec<u64> {
        self.chunks().iter().map(|c| c.index).collect()
    }

    /// Upload attempts including failed ones.
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn uploaded_chunks(&self) -> u64 {
        *self.uploaded_chunks.lock().unwrap()
    }
}

impl RemoteStore for MockStore {
    fn query_progress<'a>(
        &'a self,
        _metadata: &'a FileMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<ServerUploadState, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if self.fail_queries.load(Ordering::SeqCst) {
                return Err(service_unavailable());
            }
            let uploaded = *self.uploaded_chunks.lock().unwrap();
            Ok(ServerUploadState {
                exists: uploaded > 0,
                uploaded_chunks: uploaded,
            })
        })
    }

    fn upload_chunk<'a>(
        &'a self,
        upload: ChunkUpload<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<UploadAck, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);

            let failure = {
                let mut failures = self.failures.lock().unwrap();
                match failures.get_mut(&upload.index) {
                    Some(failure) if failure.remaining > 0 => {
                        failure.remaining -= 1;
                        Some((failure.transient, failure.lands))
                    }
                    _ => None,
                }
            };

            if let Some((transient, false)) = failure {
                return Err(if transient {
                    service_unavailable()
                } else {
                    StoreError::Status {
                        status: 400,
                        body: "File doesn't have registered metadata".into(),
                    }
                });
            }

            self.chunks.lock().unwrap().push(RecordedChunk {
                file_signature: upload.file_signature.to_string(),
                chunk_signature: upload.chunk_signature.to_string(),
                index: upload.index,
                end_offset: upload.end_offset,
                data: upload.data.to_vec(),
            });
            *self.uploaded_chunks.lock().unwrap() += 1;

            if failure.is_some() {
                return Err(service_unavailable());
            }

            Ok(UploadAck {
                message: Some("Chunk uploaded successfully".into()),
                ..UploadAck::default()
            })
        })
    }
}

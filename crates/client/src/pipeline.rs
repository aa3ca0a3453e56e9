//! Sequential chunk upload state machine.
//!
//! Each step handles exactly one chunk: plan its range, read it, sign it,
//! transmit it, then advance. Chunk `i + 1` is never sent before chunk `i`
//! has been acknowledged.

use chunkup_protocol::{FileMetadata, UploadAck};
use chunkup_transfer::{ChunkPlanner, ChunkReader, SignatureAlgorithm, signature_of};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{StoreError, UploadError};
use crate::retry::RetryPolicy;
use crate::store::{ChunkUpload, RemoteStore};
use crate::types::{ChunkProgress, UploadEvent};

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Uploading { next_index: u64 },
    Done,
    Failed,
}

/// Uploads the chunks of one file, starting at a resume offset.
pub struct UploadPipeline<'a> {
    store: &'a dyn RemoteStore,
    reader: &'a mut ChunkReader,
    metadata: &'a FileMetadata,
    planner: ChunkPlanner,
    algorithm: SignatureAlgorithm,
    retry: RetryPolicy,
    cancel: CancellationToken,
    state: PipelineState,
    progress_percent: f64,
    chunks_sent: u64,
}

impl<'a> UploadPipeline<'a> {
    /// Creates an idle pipeline.
    ///
    /// `planner` must be the one the metadata was computed with.
    pub fn new(
        store: &'a dyn RemoteStore,
        reader: &'a mut ChunkReader,
        metadata: &'a FileMetadata,
        planner: ChunkPlanner,
    ) -> Self {
        Self {
            store,
            reader,
            metadata,
            planner,
            algorithm: SignatureAlgorithm::default(),
            retry: RetryPolicy::default(),
            cancel: CancellationToken::new(),
            state: PipelineState::Idle,
            progress_percent: 0.0,
            chunks_sent: 0,
        }
    }

    /// Sets the per-chunk signature algorithm.
    pub fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the per-chunk retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the token checked between chunks.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Percentage of chunks acknowledged, as of the last acknowledged chunk.
    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    /// Chunks transmitted by this pipeline.
    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent
    }

    /// Index of the next chunk to send, while uploading.
    pub fn current_index(&self) -> Option<u64> {
        match self.state {
            PipelineState::Uploading { next_index } => Some(next_index),
            _ => None,
        }
    }

    /// Leaves `Idle`, seeded with the resume offset.
    ///
    /// An offset at or past the last chunk completes immediately. Returns
    /// `false` if the pipeline was already started.
    pub fn start(&mut self, start_index: u64) -> bool {
        if self.state != PipelineState::Idle {
            return false;
        }
        if start_index >= self.metadata.chunk_count {
            self.progress_percent = 100.0;
            self.state = PipelineState::Done;
        } else {
            self.progress_percent = percent_of(start_index, self.metadata.chunk_count);
            self.state = PipelineState::Uploading {
                next_index: start_index,
            };
        }
        true
    }

    /// Runs steps until the pipeline is `Done` or fails.
    ///
    /// Cancellation is checked between chunks; a chunk in flight always
    /// completes or fails first. Does nothing unless started.
    pub async fn run<F>(&mut self, mut notify: F) -> Result<(), UploadError>
    where
        F: FnMut(UploadEvent),
    {
        while let PipelineState::Uploading { .. } = self.state {
            if self.cancel.is_cancelled() {
                self.state = PipelineState::Failed;
                return Err(UploadError::Cancelled);
            }
            self.step(&mut notify).await?;
        }
        Ok(())
    }

    /// Uploads the next chunk. Returns `None` if not uploading.
    pub async fn step<F>(&mut self, notify: &mut F) -> Result<Option<ChunkProgress>, UploadError>
    where
        F: FnMut(UploadEvent),
    {
        let PipelineState::Uploading { next_index } = self.state else {
            return Ok(None);
        };

        match self.transmit(next_index, notify).await {
            Ok(progress) => {
                notify(UploadEvent::Progress(progress));
                Ok(Some(progress))
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    async fn transmit<F>(&mut self, index: u64, notify: &mut F) -> Result<ChunkProgress, UploadError>
    where
        F: FnMut(UploadEvent),
    {
        let size = self.metadata.size;
        let chunk_count = self.metadata.chunk_count;
        let Some(chunk) = self.planner.chunk(index, size) else {
            // Metadata and planner disagree about the chunk count.
            return Err(UploadError::Read(chunkup_transfer::TransferError::Read {
                index,
                source: std::io::ErrorKind::UnexpectedEof.into(),
            }));
        };

        let data = self.reader.read_chunk(&chunk).await?;
        let chunk_signature = signature_of(self.algorithm, &data);
        let upload = ChunkUpload {
            file_signature: &self.metadata.signature,
            chunk_signature: &chunk_signature,
            index,
            end_offset: chunk.end,
            data: &data,
        };

        let mut attempt = 1;
        loop {
            let result = if attempt > 1 {
                self.resend_unless_landed(upload).await
            } else {
                self.store.upload_chunk(upload).await.map(Some)
            };
            match result {
                Ok(None) => {
                    debug!(index, attempt, "chunk already stored, not resending");
                    break;
                }
                Ok(Some(ack)) => {
                    ack.verify()
                        .map_err(|e| UploadError::ChunkTransmission {
                            index,
                            attempts: attempt,
                            source: e.into(),
                        })?;
                    break;
                }
                Err(e) if e.is_transient() && self.retry.allows_retry(attempt) => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(index, attempt, error = %e, ?delay, "chunk upload failed, retrying");
                    notify(UploadEvent::Retrying {
                        chunk_index: index,
                        attempt,
                        delay,
                    });
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => {
                    return Err(UploadError::ChunkTransmission {
                        index,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }

        self.chunks_sent += 1;
        self.progress_percent = percent_of(index + 1, chunk_count);
        self.state = if chunk.end == size {
            PipelineState::Done
        } else {
            PipelineState::Uploading {
                next_index: index + 1,
            }
        };

        debug!(
            index,
            end_offset = chunk.end,
            percent = self.progress_percent,
            "chunk uploaded"
        );

        Ok(ChunkProgress {
            chunk_index: index,
            end_offset: chunk.end,
            percent: self.progress_percent,
        })
    }

    /// Re-sends a chunk after a transient failure, unless the store already
    /// counts it. Returns `None` when the earlier attempt landed.
    async fn resend_unless_landed(
        &self,
        upload: ChunkUpload<'_>,
    ) -> Result<Option<UploadAck>, StoreError> {
        let state = self.store.query_progress(self.metadata).await?;
        if state.uploaded_chunks > upload.index {
            return Ok(None);
        }
        self.store.upload_chunk(upload).await.map(Some)
    }
}

fn percent_of(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    done as f64 / total as f64 * 100.0
}

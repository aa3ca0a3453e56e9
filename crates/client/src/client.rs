//! Upload client façade.
//!
//! Drives one upload session through its phases: select a file, prepare it
//! (hash), submit it (resume query and chunk upload). Progress is published
//! as [`UploadEvent`]s on a bounded channel and as [`SessionSnapshot`]s.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chunkup_protocol::FileMetadata;
use chunkup_transfer::{ChunkPlanner, ChunkReader, scan_file};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::{ClientConfig, ConfigError};
use crate::error::UploadError;
use crate::http::HttpStore;
use crate::pipeline::UploadPipeline;
use crate::resume::{ResumePoint, query_resume_point};
use crate::session::{Phase, SessionSnapshot, UploadSession, UploadTicket};
use crate::store::RemoteStore;
use crate::types::{UploadEvent, UploadOutcome};

/// Resumable upload client for a single file at a time.
pub struct UploadClient {
    store: Arc<dyn RemoteStore>,
    config: ClientConfig,
    planner: ChunkPlanner,
    session: UploadSession,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
}

impl UploadClient {
    /// Creates a client over an arbitrary store.
    pub fn new(store: Arc<dyn RemoteStore>, config: ClientConfig) -> Result<Self, UploadError> {
        config.validate()?;
        let planner = ChunkPlanner::new(config.chunk_size)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer);

        Ok(Self {
            store,
            config,
            planner,
            session: UploadSession::new(),
            events_tx,
            events_rx: Some(events_rx),
        })
    }

    /// Creates a client talking HTTP to `config.base_url`.
    pub fn connect(config: ClientConfig) -> Result<Self, UploadError> {
        config.validate()?;
        let store = HttpStore::new(&config.base_url, config.request_timeout())
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {e}")))?;
        Self::new(Arc::new(store), config)
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Selects the file to upload, discarding any prior metadata.
    ///
    /// Rejected with [`UploadError::Busy`] while hashing or uploading.
    pub fn select_file(&self, path: impl Into<PathBuf>) -> Result<(), UploadError> {
        let path = path.into();
        self.session.select(path.clone())?;
        debug!(path = %path.display(), "file selected");
        self.emit(UploadEvent::PhaseChanged { phase: Phase::Idle });
        Ok(())
    }

    /// Hashes the selected file and computes its metadata.
    ///
    /// On success the session is `ReadyToSubmit`.
    pub async fn prepare(&self) -> Result<FileMetadata, UploadError> {
        let path = self.session.begin_hashing()?;
        self.emit(UploadEvent::PhaseChanged {
            phase: Phase::Hashing,
        });

        match self.scan(&path).await {
            Ok((reader, metadata)) => {
                info!(
                    path = %path.display(),
                    size = metadata.size,
                    chunks = metadata.chunk_count,
                    signature = %metadata.signature,
                    "file prepared"
                );
                self.session.finish_hashing(reader, metadata.clone());
                self.emit(UploadEvent::PhaseChanged {
                    phase: Phase::ReadyToSubmit,
                });
                Ok(metadata)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "prepare failed");
                Err(self.fail(e, None))
            }
        }
    }

    async fn scan(&self, path: &Path) -> Result<(ChunkReader, FileMetadata), UploadError> {
        let mut reader = ChunkReader::open(path).await?;
        let metadata = scan_file(
            &mut reader,
            &self.planner,
            self.config.signature_algorithm,
            |hashed_chunks, total_chunks| {
                self.session
                    .record_hash_progress(hashed_chunks as f64 / total_chunks as f64 * 100.0);
                self.emit(UploadEvent::Hashing {
                    hashed_chunks,
                    total_chunks,
                });
            },
        )
        .await?;
        Ok((reader, metadata))
    }

    /// Uploads whatever the store does not already hold.
    ///
    /// Queries the store first and starts at its reported chunk count. After
    /// a failure, calling `submit()` again resumes from the store's state.
    pub async fn submit(&self) -> Result<UploadOutcome, UploadError> {
        let UploadTicket {
            path,
            reader,
            metadata,
            cancel,
        } = self.session.begin_upload()?;
        self.emit(UploadEvent::PhaseChanged {
            phase: Phase::Uploading,
        });

        let mut reader = match reader {
            Some(reader) => reader,
            None => match ChunkReader::open(&path).await {
                Ok(reader) => reader,
                Err(e) => return Err(self.fail(e.into(), None)),
            },
        };

        match self.upload(&mut reader, &metadata, cancel).await {
            Ok(outcome) => {
                info!(
                    signature = %metadata.signature,
                    already_stored = outcome.already_stored,
                    start_index = outcome.start_index,
                    chunks_sent = outcome.chunks_sent,
                    "upload complete"
                );
                self.session.finish_upload();
                self.emit(UploadEvent::PhaseChanged { phase: Phase::Done });
                self.emit(UploadEvent::Completed {
                    already_stored: outcome.already_stored,
                    chunks_sent: outcome.chunks_sent,
                });
                Ok(outcome)
            }
            Err(e) => {
                error!(signature = %metadata.signature, error = %e, "upload failed");
                Err(self.fail(e, Some(reader)))
            }
        }
    }

    async fn upload(
        &self,
        reader: &mut ChunkReader,
        metadata: &FileMetadata,
        cancel: CancellationToken,
    ) -> Result<UploadOutcome, UploadError> {
        let start_index = match query_resume_point(self.store.as_ref(), metadata).await? {
            ResumePoint::AlreadyStored => {
                return Ok(UploadOutcome {
                    already_stored: true,
                    start_index: metadata.chunk_count,
                    chunks_sent: 0,
                });
            }
            ResumePoint::StartAt(index) => index,
        };

        self.session.record_resume(
            start_index,
            start_index as f64 / metadata.chunk_count as f64 * 100.0,
        );
        self.emit(UploadEvent::Resuming {
            start_index,
            chunk_count: metadata.chunk_count,
        });

        let mut pipeline = UploadPipeline::new(self.store.as_ref(), reader, metadata, self.planner)
            .with_algorithm(self.config.signature_algorithm)
            .with_retry(self.config.retry.clone())
            .with_cancel(cancel);
        pipeline.start(start_index);
        pipeline
            .run(|event| {
                if let UploadEvent::Progress(progress) = &event {
                    self.session
                        .record_progress(progress.chunk_index, progress.percent);
                }
                self.emit(event);
            })
            .await?;

        Ok(UploadOutcome {
            already_stored: false,
            start_index,
            chunks_sent: pipeline.chunks_sent(),
        })
    }

    /// Requests cancellation of the running upload.
    ///
    /// Takes effect before the next chunk; the chunk in flight completes or
    /// fails first. The session ends `Failed` and can be resubmitted.
    pub fn cancel(&self) {
        self.session.cancel();
    }

    fn fail(&self, error: UploadError, reader: Option<ChunkReader>) -> UploadError {
        self.session.fail(&error, reader);
        self.emit(UploadEvent::PhaseChanged {
            phase: Phase::Failed,
        });
        self.emit(UploadEvent::Failed {
            error: error.to_string(),
        });
        error
    }

    /// Publishes an event without waiting; drops it if the channel is full.
    fn emit(&self, event: UploadEvent) {
        if self.events_tx.try_send(event).is_err() {
            debug!("event channel full or closed, event dropped");
        }
    }
}

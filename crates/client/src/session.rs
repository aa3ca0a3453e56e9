//! Upload session lifecycle.

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chunkup_protocol::FileMetadata;
use chunkup_transfer::ChunkReader;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::UploadError;

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Hashing,
    ReadyToSubmit,
    Uploading,
    Done,
    Failed,
}

impl Phase {
    /// Returns `true` while work is in progress.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Hashing | Self::Uploading)
    }
}

/// Point-in-time view of a session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub file: Option<PathBuf>,
    pub metadata: Option<FileMetadata>,
    /// Last chunk acknowledged during the current upload.
    pub current_chunk_index: Option<u64>,
    pub progress_percent: f64,
    pub error: Option<String>,
}

struct SessionInner {
    phase: Phase,
    file: Option<PathBuf>,
    reader: Option<ChunkReader>,
    metadata: Option<FileMetadata>,
    current_chunk_index: Option<u64>,
    progress_percent: f64,
    error: Option<String>,
    cancel: CancellationToken,
}

impl SessionInner {
    fn clear_progress(&mut self) {
        self.current_chunk_index = None;
        self.progress_percent = 0.0;
        self.error = None;
    }
}

/// What an upload needs from a ready session.
pub(crate) struct UploadTicket {
    pub path: PathBuf,
    /// Handle kept from hashing; `None` once released.
    pub reader: Option<ChunkReader>,
    pub metadata: FileMetadata,
    /// Cancels this upload only. Replaced on every `begin_upload`.
    pub cancel: CancellationToken,
}

/// State of the single upload a client drives.
///
/// Every transition is checked here; callers never set the phase directly.
pub(crate) struct UploadSession {
    inner: RwLock<SessionInner>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SessionInner {
                phase: Phase::Idle,
                file: None,
                reader: None,
                metadata: None,
                current_chunk_index: None,
                progress_percent: 0.0,
                error: None,
                cancel: CancellationToken::new(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.read().phase
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.read();
        SessionSnapshot {
            phase: inner.phase,
            file: inner.file.clone(),
            metadata: inner.metadata.clone(),
            current_chunk_index: inner.current_chunk_index,
            progress_percent: inner.progress_percent,
            error: inner.error.clone(),
        }
    }

    /// Replaces the selected file, discarding prior metadata.
    pub fn select(&self, path: PathBuf) -> Result<(), UploadError> {
        let mut inner = self.write();
        if inner.phase.is_busy() {
            return Err(UploadError::Busy(inner.phase));
        }
        inner.phase = Phase::Idle;
        inner.file = Some(path);
        inner.reader = None;
        inner.metadata = None;
        inner.clear_progress();
        Ok(())
    }

    /// Enters `Hashing`. Returns the path to scan.
    pub fn begin_hashing(&self) -> Result<PathBuf, UploadError> {
        let mut inner = self.write();
        if inner.phase.is_busy() {
            return Err(UploadError::Busy(inner.phase));
        }
        let path = inner.file.clone().ok_or(UploadError::NoFileSelected)?;
        inner.phase = Phase::Hashing;
        inner.reader = None;
        inner.metadata = None;
        inner.clear_progress();
        Ok(path)
    }

    /// Records how much of the file has been hashed.
    pub fn record_hash_progress(&self, percent: f64) {
        self.write().progress_percent = percent;
    }

    pub fn finish_hashing(&self, reader: ChunkReader, metadata: FileMetadata) {
        let mut inner = self.write();
        inner.phase = Phase::ReadyToSubmit;
        inner.reader = Some(reader);
        inner.metadata = Some(metadata);
        inner.progress_percent = 0.0;
    }

    /// Enters `Uploading`, taking the file handle out of the session.
    ///
    /// Allowed from `ReadyToSubmit`, and from `Failed` when metadata is
    /// still known (a resubmit after a failed upload).
    pub fn begin_upload(&self) -> Result<UploadTicket, UploadError> {
        let mut inner = self.write();
        match inner.phase {
            Phase::ReadyToSubmit | Phase::Failed => {}
            phase if phase.is_busy() => return Err(UploadError::Busy(phase)),
            phase => return Err(UploadError::NotReady(phase)),
        }
        let Some(metadata) = inner.metadata.clone() else {
            return Err(UploadError::NotReady(inner.phase));
        };
        let path = inner.file.clone().ok_or(UploadError::NoFileSelected)?;

        inner.phase = Phase::Uploading;
        inner.clear_progress();
        inner.cancel = CancellationToken::new();
        Ok(UploadTicket {
            path,
            reader: inner.reader.take(),
            metadata,
            cancel: inner.cancel.clone(),
        })
    }

    /// Cancels the upload started by the last `begin_upload`.
    pub fn cancel(&self) {
        self.read().cancel.cancel();
    }

    /// Records the store's resume offset before any chunk is sent.
    pub fn record_resume(&self, start_index: u64, percent: f64) {
        let mut inner = self.write();
        inner.current_chunk_index = start_index.checked_sub(1);
        inner.progress_percent = percent;
    }

    pub fn record_progress(&self, chunk_index: u64, percent: f64) {
        let mut inner = self.write();
        inner.current_chunk_index = Some(chunk_index);
        inner.progress_percent = percent;
    }

    /// Enters `Done` and releases the file handle.
    pub fn finish_upload(&self) {
        let mut inner = self.write();
        inner.phase = Phase::Done;
        inner.reader = None;
        inner.progress_percent = 100.0;
        inner.error = None;
    }

    /// Enters `Failed`, keeping the handle (if any) for a resubmit.
    pub fn fail(&self, error: &UploadError, reader: Option<ChunkReader>) {
        let mut inner = self.write();
        inner.phase = Phase::Failed;
        inner.reader = reader;
        inner.error = Some(error.to_string());
    }
}

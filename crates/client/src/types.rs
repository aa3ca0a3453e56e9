//! Data types exchanged with the host.

use std::time::Duration;

use crate::session::Phase;

/// Event emitted while preparing or uploading.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// The session moved to a new phase.
    PhaseChanged { phase: Phase },
    /// A chunk was appended to the whole-file hash.
    Hashing { hashed_chunks: u64, total_chunks: u64 },
    /// The store reported its progress; uploading starts at `start_index`.
    Resuming { start_index: u64, chunk_count: u64 },
    /// A chunk was acknowledged by the store.
    Progress(ChunkProgress),
    /// A chunk attempt failed and will be retried after `delay`.
    Retrying {
        chunk_index: u64,
        attempt: u32,
        delay: Duration,
    },
    /// Every chunk is stored.
    Completed { already_stored: bool, chunks_sent: u64 },
    /// The session failed.
    Failed { error: String },
}

/// Progress after one acknowledged chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkProgress {
    pub chunk_index: u64,
    pub end_offset: u64,
    /// `(chunk_index + 1) / chunk_count * 100`.
    pub percent: f64,
}

/// Result of a successful `submit()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOutcome {
    /// The store already held every chunk; nothing was sent.
    pub already_stored: bool,
    /// First chunk index transmitted (the store's resume offset).
    pub start_index: u64,
    /// Number of chunks transmitted by this submit.
    pub chunks_sent: u64,
}

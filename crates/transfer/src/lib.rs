//! Chunk planning, streaming content signatures and byte-range reads.
//!
//! The same [`ChunkPlanner`] must drive hashing and uploading for a file,
//! otherwise chunk boundaries and server-side offsets disagree.

mod hash;
mod planner;
mod reader;
mod scan;

pub use hash::{HashStream, SignatureAlgorithm, signature_of};
pub use planner::{ChunkDescriptor, ChunkPlan, ChunkPlanner};
pub use reader::ChunkReader;
pub use scan::scan_file;

pub use chunkup_protocol::constants::DEFAULT_CHUNK_SIZE;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read chunk {index}: {source}")]
    Read {
        index: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("file is empty")]
    EmptyFile,

    #[error("hash covers {hashed} of {expected} bytes")]
    HashIncomplete { expected: u64, hashed: u64 },
}

use chunkup_protocol::FileMetadata;
use tracing::debug;

use crate::TransferError;
use crate::hash::{HashStream, SignatureAlgorithm};
use crate::planner::ChunkPlanner;
use crate::reader::ChunkReader;

/// Streams every chunk of the file through one hash and builds its metadata.
///
/// Chunks are read and appended strictly in ascending order. `on_chunk` is
/// called with `(hashed_chunks, chunk_count)` after each chunk. Empty files
/// are rejected: they have no chunks to upload.
pub async fn scan_file<F>(
    reader: &mut ChunkReader,
    planner: &ChunkPlanner,
    algorithm: SignatureAlgorithm,
    mut on_chunk: F,
) -> Result<FileMetadata, TransferError>
where
    F: FnMut(u64, u64),
{
    let size = reader.file_size();
    if size == 0 {
        return Err(TransferError::EmptyFile);
    }

    let chunk_count = planner.chunk_count(size);
    debug!(
        path = %reader.path().display(),
        size,
        chunk_count,
        algorithm = algorithm.as_str(),
        "scanning file"
    );

    let mut stream = HashStream::begin(algorithm);
    for chunk in planner.plan(size) {
        let bytes = reader.read_chunk(&chunk).await?;
        stream.append(&bytes);
        on_chunk(chunk.index + 1, chunk_count);
    }
    let signature = stream.finish_covering(size)?;

    debug!(%signature, "scan complete");
    Ok(FileMetadata {
        size,
        chunk_count,
        signature,
    })
}

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::TransferError;
use crate::planner::ChunkDescriptor;

/// Reads byte ranges of a file for hashing and transmission.
///
/// Owns the file handle exclusively; a session never shares it between two
/// code paths.
pub struct ChunkReader {
    file: File,
    path: PathBuf,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` and records its current size.
    pub async fn open(path: &Path) -> Result<Self, TransferError> {
        let file = File::open(path).await?;
        let file_size = file.metadata().await?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            file_size,
        })
    }

    /// File size observed when the reader was opened.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path the reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full byte range of `chunk`.
    ///
    /// A short read (the file shrank since it was scanned) is a read failure,
    /// never a truncated buffer.
    pub async fn read_chunk(&mut self, chunk: &ChunkDescriptor) -> Result<Vec<u8>, TransferError> {
        let read_err = |source: std::io::Error| TransferError::Read {
            index: chunk.index,
            source,
        };

        self.file
            .seek(SeekFrom::Start(chunk.start))
            .await
            .map_err(read_err)?;

        let mut buf = vec![0u8; chunk.len() as usize];
        self.file.read_exact(&mut buf).await.map_err(read_err)?;
        Ok(buf)
    }
}

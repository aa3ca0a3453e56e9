use std::ops::Range;

use crate::TransferError;

/// One contiguous byte range of a file: `[start, end)`.
///
/// Recomputed on demand from the file size and chunk width; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// Zero-based chunk index.
    pub index: u64,
    /// First byte of the chunk.
    pub start: u64,
    /// One past the last byte of the chunk.
    pub end: u64,
}

impl ChunkDescriptor {
    /// Width of the chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` for a zero-width chunk.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Byte range covered by the chunk.
    pub fn range(&self) -> Range<u64> {
        self.start..self.end
    }
}

/// Splits files into fixed-width chunks. The last chunk may be shorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlanner {
    chunk_size: u64,
}

impl ChunkPlanner {
    /// Creates a planner with the given chunk width.
    pub fn new(chunk_size: u64) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize);
        }
        Ok(Self { chunk_size })
    }

    /// Chunk width in bytes.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks covering `file_size` bytes: `ceil(file_size / chunk_size)`.
    pub fn chunk_count(&self, file_size: u64) -> u64 {
        file_size.div_ceil(self.chunk_size)
    }

    /// Returns the chunk at `index`, or `None` past the end of the file.
    pub fn chunk(&self, index: u64, file_size: u64) -> Option<ChunkDescriptor> {
        if index >= self.chunk_count(file_size) {
            return None;
        }
        let start = index * self.chunk_size;
        let end = start.saturating_add(self.chunk_size).min(file_size);
        Some(ChunkDescriptor { index, start, end })
    }

    /// Returns the ordered chunks covering `[0, file_size)`.
    pub fn plan(&self, file_size: u64) -> ChunkPlan {
        ChunkPlan {
            planner: *self,
            file_size,
            next: 0,
        }
    }
}

/// Iterator over the chunks of a file, in ascending index order.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    planner: ChunkPlanner,
    file_size: u64,
    next: u64,
}

impl ChunkPlan {
    /// Skips ahead so iteration starts at `index`.
    pub fn starting_at(mut self, index: u64) -> Self {
        self.next = index;
        self
    }
}

impl Iterator for ChunkPlan {
    type Item = ChunkDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.planner.chunk(self.next, self.file_size)?;
        self.next += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .planner
            .chunk_count(self.file_size)
            .saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkPlan {}

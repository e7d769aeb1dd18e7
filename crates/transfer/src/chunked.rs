use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use crate::TransferError;
use crate::types::UploadSource;
use crate::validation::validate_chunk_size_mb;

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Upload chunk size in bytes. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSize(u64);

impl ChunkSize {
    /// Chunk size in MiB as accepted from callers (1 to 50).
    pub fn from_mb(mb: u32) -> Result<Self, TransferError> {
        validate_chunk_size_mb(mb)?;
        Ok(Self(u64::from(mb) * MIB))
    }

    /// Any positive byte size. Used by tests and internal callers.
    pub fn from_bytes(bytes: u64) -> Option<Self> {
        (bytes > 0).then_some(Self(bytes))
    }

    pub fn bytes(self) -> u64 {
        self.0
    }

    /// Number of chunks needed for `total` bytes (rounded up).
    pub fn chunk_count(self, total: u64) -> u64 {
        total.div_ceil(self.0)
    }

    /// Length of chunk `index` for `total` bytes. The last chunk is the remainder.
    pub fn chunk_len(self, total: u64, index: u64) -> u64 {
        let offset = index.saturating_mul(self.0);
        total.saturating_sub(offset).min(self.0)
    }
}

/// A chunk of upload data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based chunk index.
    pub index: u64,
    /// Byte offset within the source.
    pub offset: u64,
    pub data: Vec<u8>,
}

enum Backing {
    File(File),
    Bytes(Vec<u8>),
}

/// Reads an upload source chunk by chunk.
///
/// Files are read with a seek and a bounded read per chunk, so only one
/// chunk is held in memory at a time.
pub struct ChunkReader {
    backing: Backing,
    chunk_size: ChunkSize,
    total: u64,
    next_index: u64,
}

impl ChunkReader {
    /// Opens `source`. Missing files and empty sources are rejected here,
    /// before any request is made.
    pub fn open(source: UploadSource, chunk_size: ChunkSize) -> Result<Self, TransferError> {
        let (backing, total) = match source {
            UploadSource::File(path) => {
                let file = File::open(&path).map_err(|e| match e.kind() {
                    io::ErrorKind::NotFound => TransferError::SourceNotFound(path.clone()),
                    _ => TransferError::Io(e),
                })?;
                let meta = file.metadata()?;
                if !meta.is_file() {
                    return Err(TransferError::SourceNotFound(path));
                }
                (Backing::File(file), meta.len())
            }
            UploadSource::Bytes(buf) => {
                let len = buf.len() as u64;
                (Backing::Bytes(buf), len)
            }
        };

        if total == 0 {
            return Err(TransferError::EmptySource);
        }

        Ok(Self {
            backing,
            chunk_size,
            total,
            next_index: 0,
        })
    }

    /// Reads chunk `index`.
    pub fn read_chunk(&mut self, index: u64) -> Result<Chunk, TransferError> {
        let count = self.chunk_count();
        if index >= count {
            return Err(TransferError::OutOfSequence {
                index,
                expected: count.saturating_sub(1),
            });
        }

        let offset = index * self.chunk_size.bytes();
        let len = self.chunk_size.chunk_len(self.total, index) as usize;

        let data = match &mut self.backing {
            Backing::File(file) => {
                file.seek(SeekFrom::Start(offset))?;
                let mut buf = vec![0u8; len];
                file.read_exact(&mut buf)?;
                buf
            }
            Backing::Bytes(buf) => {
                let start = offset as usize;
                buf[start..start + len].to_vec()
            }
        };

        Ok(Chunk {
            index,
            offset,
            data,
        })
    }

    /// Reads the next chunk in order. Returns `None` after the last one.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        if self.next_index >= self.chunk_count() {
            return Ok(None);
        }
        let chunk = self.read_chunk(self.next_index)?;
        self.next_index += 1;
        Ok(Some(chunk))
    }

    pub fn total_bytes(&self) -> u64 {
        self.total
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_size.chunk_count(self.total)
    }
}

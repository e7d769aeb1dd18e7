use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::chunked::ChunkSize;
use crate::{DEFAULT_CHUNK_FETCH_SIZE, DEFAULT_WORKERS, TransferError};

/// Data to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// Local file, read chunk by chunk.
    File(PathBuf),
    /// In-memory buffer, sliced into chunks.
    Bytes(Vec<u8>),
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(buf: Vec<u8>) -> Self {
        Self::Bytes(buf)
    }
}

/// Result of a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub file_id: String,
    pub chunks: u64,
    pub bytes: u64,
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Upload of file {} complete.", self.file_id)
    }
}

/// Tuning for ranged downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    /// Bytes requested per ranged GET.
    pub chunk_fetch_size: u64,
    /// Concurrent requests in flight.
    pub workers: usize,
    /// Leading bytes dropped before CSV normalization.
    pub skip_bytes: usize,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            chunk_fetch_size: DEFAULT_CHUNK_FETCH_SIZE,
            workers: DEFAULT_WORKERS,
            skip_bytes: 0,
        }
    }
}

/// Bytes of a downloaded object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadedObject {
    pub bytes: Vec<u8>,
    /// Number of non-empty ranges that made up `bytes`.
    pub chunks: u64,
    /// A range request failed before the end of the object was reached.
    pub truncated: bool,
}

// ---------------------------------------------------------------------------
// TransferSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Completed,
    Abandoned,
}

/// Bookkeeping for one upload.
///
/// The cursor only moves forward one chunk at a time, and completion is
/// refused until every chunk in `0..chunk_count` has been acknowledged.
#[derive(Debug)]
pub struct TransferSession {
    file_id: String,
    total_bytes: u64,
    chunk_size: ChunkSize,
    next_index: u64,
    transferred_bytes: u64,
    state: SessionState,
    started_at: Instant,
}

impl TransferSession {
    pub fn new(file_id: impl Into<String>, total_bytes: u64, chunk_size: ChunkSize) -> Self {
        Self {
            file_id: file_id.into(),
            total_bytes,
            chunk_size,
            next_index: 0,
            transferred_bytes: 0,
            state: SessionState::Open,
            started_at: Instant::now(),
        }
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_size.chunk_count(self.total_bytes)
    }

    /// Chunks acknowledged so far.
    pub fn acknowledged(&self) -> u64 {
        self.next_index
    }

    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Index of the next chunk to send, or `None` when all are acknowledged
    /// or the session is closed.
    pub fn next_index(&self) -> Option<u64> {
        (self.state == SessionState::Open && self.next_index < self.chunk_count())
            .then_some(self.next_index)
    }

    /// Records that chunk `index` of `bytes` length was accepted.
    pub fn acknowledge(&mut self, index: u64, bytes: u64) -> Result<(), TransferError> {
        if self.state != SessionState::Open || index != self.next_index {
            return Err(TransferError::OutOfSequence {
                index,
                expected: self.next_index,
            });
        }
        let expected_len = self.chunk_size.chunk_len(self.total_bytes, index);
        if bytes != expected_len {
            return Err(TransferError::Incomplete {
                file_id: self.file_id.clone(),
                acknowledged: self.next_index,
                expected: self.chunk_count(),
            });
        }
        self.next_index += 1;
        self.transferred_bytes += bytes;
        Ok(())
    }

    /// Closes the session for completion and returns the chunk count to
    /// announce. Fails unless every chunk was acknowledged, and only once.
    pub fn finish(&mut self) -> Result<u64, TransferError> {
        match self.state {
            SessionState::Completed => {
                return Err(TransferError::AlreadyCompleted(self.file_id.clone()));
            }
            SessionState::Abandoned => {
                return Err(TransferError::Incomplete {
                    file_id: self.file_id.clone(),
                    acknowledged: self.next_index,
                    expected: self.chunk_count(),
                });
            }
            SessionState::Open => {}
        }
        let expected = self.chunk_count();
        if self.next_index != expected {
            return Err(TransferError::Incomplete {
                file_id: self.file_id.clone(),
                acknowledged: self.next_index,
                expected,
            });
        }
        self.state = SessionState::Completed;
        Ok(expected)
    }

    /// Gives up on the session. No completion can follow.
    pub fn abandon(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Abandoned;
        }
    }
}

//! Chunked file transfer against the model file store.
//!
//! Uploads are strictly sequential: declare, chunks `0..n` in order, then a
//! single completion marker. Downloads fetch byte ranges through a small
//! pool of concurrent requests and reassemble them by offset.

mod chunked;
mod download;
mod normalize;
mod progress;
mod types;
mod upload;
mod validation;

use std::path::PathBuf;

use planlink_connection::ApiError;
use planlink_protocol::ErrorKind;
use planlink_protocol::constants::{MAX_CHUNK_MB, MIN_CHUNK_MB};

pub use chunked::{Chunk, ChunkReader, ChunkSize, MIB};
pub use download::{RangeSource, RemoteObject, download_from, download_object};
pub use normalize::normalize_csv;
pub use progress::{RateMeter, format_rate};
pub use types::{
    DownloadOptions, DownloadedObject, SessionState, TransferSession, UploadOutcome, UploadSource,
};
pub use upload::{RemoteFile, UploadTarget, upload, upload_to};
pub use validation::{validate_chunk_size_mb, validate_download_options, validate_target_id};

/// Default number of bytes requested per ranged GET.
pub const DEFAULT_CHUNK_FETCH_SIZE: u64 = 100_000;

/// Default number of concurrent ranged GETs.
pub const DEFAULT_WORKERS: usize = 4;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk size must be between {MIN_CHUNK_MB} and {MAX_CHUNK_MB} MiB, got {0}")]
    InvalidChunkSize(u32),

    #[error("source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("upload source is empty")]
    EmptySource,

    #[error("invalid file id: {0}")]
    InvalidTarget(String),

    #[error("invalid download options: {0}")]
    InvalidOptions(String),

    #[error("chunk {index} out of sequence, expected {expected}")]
    OutOfSequence { index: u64, expected: u64 },

    #[error("upload of {file_id} incomplete: {acknowledged} of {expected} chunks acknowledged")]
    Incomplete {
        file_id: String,
        acknowledged: u64,
        expected: u64,
    },

    #[error("upload of {0} already completed")]
    AlreadyCompleted(String),

    #[error("file metadata rejected: {0}")]
    Declare(#[source] ApiError),

    #[error("chunk {index} failed: {source}")]
    ChunkFailed {
        index: u64,
        #[source]
        source: ApiError,
    },

    #[error("completion marker failed: {0}")]
    Complete(#[source] ApiError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_)
            | Self::InvalidChunkSize(_)
            | Self::SourceNotFound(_)
            | Self::EmptySource
            | Self::InvalidTarget(_)
            | Self::InvalidOptions(_) => ErrorKind::Usage,
            Self::OutOfSequence { .. }
            | Self::Incomplete { .. }
            | Self::AlreadyCompleted(_)
            | Self::Csv(_) => ErrorKind::Protocol,
            Self::Declare(e) | Self::Complete(e) | Self::Api(e) => e.kind(),
            Self::ChunkFailed { source, .. } => source.kind(),
        }
    }
}

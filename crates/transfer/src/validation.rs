use planlink_protocol::constants::{MAX_CHUNK_MB, MIN_CHUNK_MB};

use crate::TransferError;
use crate::types::DownloadOptions;

/// Checks an upload chunk size given in MiB.
pub fn validate_chunk_size_mb(mb: u32) -> Result<(), TransferError> {
    if !(MIN_CHUNK_MB..=MAX_CHUNK_MB).contains(&mb) {
        return Err(TransferError::InvalidChunkSize(mb));
    }
    Ok(())
}

/// Validates that a file id can be placed in a URL path segment.
///
/// Rejects:
/// - Empty ids
/// - Path separators (`/`, `\`)
/// - Parent segments (`..`)
/// - Query, fragment and control characters
pub fn validate_target_id(file_id: &str) -> Result<(), TransferError> {
    if file_id.is_empty() {
        return Err(TransferError::InvalidTarget("empty id".into()));
    }
    if file_id == "." || file_id == ".." {
        return Err(TransferError::InvalidTarget(format!(
            "relative segment not allowed: {file_id}"
        )));
    }
    if let Some(c) = file_id
        .chars()
        .find(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_control())
    {
        return Err(TransferError::InvalidTarget(format!(
            "character {c:?} not allowed: {file_id}"
        )));
    }
    Ok(())
}

/// Checks fetch size and worker count.
pub fn validate_download_options(options: &DownloadOptions) -> Result<(), TransferError> {
    if options.chunk_fetch_size == 0 {
        return Err(TransferError::InvalidOptions(
            "chunk_fetch_size must be positive".into(),
        ));
    }
    if options.workers == 0 {
        return Err(TransferError::InvalidOptions(
            "workers must be positive".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_range() {
        assert!(validate_chunk_size_mb(1).is_ok());
        assert!(validate_chunk_size_mb(25).is_ok());
        assert!(validate_chunk_size_mb(50).is_ok());
        assert!(matches!(
            validate_chunk_size_mb(0),
            Err(TransferError::InvalidChunkSize(0))
        ));
        assert!(matches!(
            validate_chunk_size_mb(51),
            Err(TransferError::InvalidChunkSize(51))
        ));
    }

    #[test]
    fn accepts_numeric_file_id() {
        assert!(validate_target_id("113000000012").is_ok());
    }

    #[test]
    fn accepts_named_file_id() {
        assert!(validate_target_id("Sales_Q3.csv").is_ok());
    }

    #[test]
    fn rejects_empty_id() {
        assert!(validate_target_id("").is_err());
    }

    #[test]
    fn rejects_path_separators() {
        assert!(validate_target_id("a/b").is_err());
        assert!(validate_target_id("a\\b").is_err());
    }

    #[test]
    fn rejects_parent_segment() {
        assert!(validate_target_id("..").is_err());
    }

    #[test]
    fn rejects_query_characters() {
        assert!(validate_target_id("113?x=1").is_err());
        assert!(validate_target_id("113\n").is_err());
    }

    #[test]
    fn download_options() {
        assert!(validate_download_options(&DownloadOptions::default()).is_ok());
        let zero_size = DownloadOptions {
            chunk_fetch_size: 0,
            ..Default::default()
        };
        assert!(validate_download_options(&zero_size).is_err());
        let zero_workers = DownloadOptions {
            workers: 0,
            ..Default::default()
        };
        assert!(validate_download_options(&zero_workers).is_err());
    }
}

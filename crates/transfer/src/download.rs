//! Concurrent ranged download with ordered reassembly.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use planlink_connection::{ApiError, ConnectionContext, check_status};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::TransferError;
use crate::types::{DownloadOptions, DownloadedObject};
use crate::validation::{validate_download_options, validate_target_id};

/// Source of byte ranges of a stored object.
pub trait RangeSource: Send + Sync {
    /// Fetches up to `len` bytes starting at `offset`. Fewer bytes (or none)
    /// mean the object ends inside the range.
    fn fetch<'a>(
        &'a self,
        object_id: &'a str,
        offset: u64,
        len: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ApiError>> + Send + 'a>>;
}

/// Files of the model bound to a [`ConnectionContext`], read with `Range`
/// requests.
pub struct RemoteObject<'c> {
    ctx: &'c ConnectionContext,
}

impl<'c> RemoteObject<'c> {
    pub fn new(ctx: &'c ConnectionContext) -> Self {
        Self { ctx }
    }
}

impl RangeSource for RemoteObject<'_> {
    fn fetch<'a>(
        &'a self,
        object_id: &'a str,
        offset: u64,
        len: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.ctx.file_url(object_id);
            let end = offset + len.max(1) - 1;
            let resp = self.ctx.get_range(&url, offset, end).await?;

            // 416: the range starts past the end of the object.
            if resp.status() == StatusCode::RANGE_NOT_SATISFIABLE {
                return Ok(Vec::new());
            }
            let resp = check_status(resp).await?;
            let partial = resp.status() == StatusCode::PARTIAL_CONTENT;
            let body = resp.bytes().await?;

            if partial {
                let take = body.len().min(len as usize);
                return Ok(body[..take].to_vec());
            }

            // Range ignored: slice the full body ourselves.
            let start = (offset as usize).min(body.len());
            let stop = (offset.saturating_add(len) as usize).min(body.len());
            Ok(body[start..stop].to_vec())
        })
    }
}

/// Downloads object `object_id` from the context's model.
pub async fn download_object(
    ctx: &ConnectionContext,
    object_id: &str,
    options: &DownloadOptions,
) -> Result<DownloadedObject, TransferError> {
    download_from(&RemoteObject::new(ctx), object_id, options).await
}

/// Fetches `object_id` from `source` with up to `options.workers` ranges in
/// flight.
///
/// Offsets are scheduled in increasing order until a range comes back short
/// or fails; requests already in flight are drained. The result is the
/// contiguous prefix from offset 0. A failed range is not retried: the
/// result is marked `truncated` instead.
pub async fn download_from(
    source: &dyn RangeSource,
    object_id: &str,
    options: &DownloadOptions,
) -> Result<DownloadedObject, TransferError> {
    validate_target_id(object_id)?;
    validate_download_options(options)?;

    let size = options.chunk_fetch_size;
    let mut in_flight = FuturesUnordered::new();
    let mut slots: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
    let mut next_index: u64 = 0;
    let mut stopped = false;
    let mut first_error: Option<(u64, ApiError)> = None;

    debug!(object_id, chunk_fetch_size = size, workers = options.workers, "starting download");

    while in_flight.len() < options.workers {
        in_flight.push(fetch_slot(source, object_id, next_index, size));
        next_index += 1;
    }

    while let Some((index, result)) = in_flight.next().await {
        match result {
            Ok(data) => {
                let short = (data.len() as u64) < size;
                debug!(object_id, offset = index * size, bytes = data.len(), "range received");
                slots.insert(index, data);
                if short {
                    stopped = true;
                }
            }
            Err(e) => {
                warn!(object_id, offset = index * size, error = %e, "range request failed");
                stopped = true;
                if first_error.as_ref().is_none_or(|(i, _)| index < *i) {
                    first_error = Some((index, e));
                }
            }
        }

        if !stopped {
            in_flight.push(fetch_slot(source, object_id, next_index, size));
            next_index += 1;
        }
    }

    let mut bytes = Vec::new();
    let mut chunks = 0;
    let mut truncated = false;
    for index in 0.. {
        match slots.get(&index) {
            Some(data) => {
                bytes.extend_from_slice(data);
                if !data.is_empty() {
                    chunks += 1;
                }
                if (data.len() as u64) < size {
                    break;
                }
            }
            None => {
                truncated = first_error.is_some();
                break;
            }
        }
    }

    if truncated {
        if let Some((index, e)) = &first_error {
            warn!(
                object_id,
                offset = index * size,
                bytes = bytes.len(),
                error = %e,
                "download truncated"
            );
        }
    } else {
        info!(object_id, bytes = bytes.len(), chunks, "download complete");
    }

    Ok(DownloadedObject {
        bytes,
        chunks,
        truncated,
    })
}

async fn fetch_slot(
    source: &dyn RangeSource,
    object_id: &str,
    index: u64,
    size: u64,
) -> (u64, Result<Vec<u8>, ApiError>) {
    (index, source.fetch(object_id, index * size, size).await)
}

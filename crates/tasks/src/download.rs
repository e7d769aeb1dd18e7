//! Export an action and hand back its file content.

use planlink_connection::{ConnectionContext, RetryPolicy};
use planlink_protocol::ActionKind;
use planlink_transfer::{DownloadOptions, normalize_csv};
use tracing::{info, warn};

use crate::error::TaskError;
use crate::executor::{ActionExecutor, PollConfig};

/// Runs export `action_id` and returns its normalized CSV content.
///
/// The whole action is retried, `retry_count` attempts 1 second apart, while
/// the server reports it as busy. The first `options.skip_bytes` bytes of
/// the payload are dropped before normalization.
pub async fn download(
    ctx: &ConnectionContext,
    action_id: &str,
    options: &DownloadOptions,
    retry_count: u32,
) -> Result<Vec<u8>, TaskError> {
    download_with(
        ctx,
        action_id,
        options,
        RetryPolicy::transport(retry_count),
        PollConfig::default(),
    )
    .await
}

/// [`download`] with explicit export retry and polling settings.
pub async fn download_with(
    ctx: &ConnectionContext,
    action_id: &str,
    options: &DownloadOptions,
    policy: RetryPolicy,
    poll: PollConfig,
) -> Result<Vec<u8>, TaskError> {
    if ActionKind::from_action_id(action_id) != Some(ActionKind::Export) {
        return Err(TaskError::NotAnExport(action_id.to_string()));
    }

    let executor = ActionExecutor::new(ctx)
        .with_submit_policy(policy)
        .with_poll_config(poll)
        .with_download_options(*options);

    let result = policy
        .run(
            "export",
            |_| executor.execute(action_id),
            TaskError::is_not_ready,
        )
        .await?;

    if result.truncated {
        warn!(action_id, "export payload is incomplete");
    }
    let payload = result.payload.unwrap_or_default();
    let skip = options.skip_bytes.min(payload.len());
    let content = normalize_csv(&payload[skip..])?;
    info!(action_id, bytes = content.len(), "export content ready");
    Ok(content)
}

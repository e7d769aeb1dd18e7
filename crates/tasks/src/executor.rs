//! Action submission and task polling.

use std::time::Duration;

use planlink_connection::{ApiError, ConnectionContext, RetryPolicy};
use planlink_protocol::messages::TaskSubmitResponse;
use planlink_protocol::{ActionKind, TaskInfo, TaskSubmitRequest};
use planlink_transfer::{DownloadOptions, validate_target_id};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::parser;
use crate::result::TaskResult;

/// Submission attempts used when the caller gives no retry count.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// A submitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: String,
    pub action_id: String,
    pub kind: ActionKind,
    /// `GET` target reporting the task status.
    pub status_url: String,
}

/// How a running task is watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Give up after this long. `None` polls until the server finishes.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: None,
        }
    }
}

/// Runs server-side actions against the model bound to a context.
#[derive(Debug, Clone)]
pub struct ActionExecutor<'c> {
    ctx: &'c ConnectionContext,
    submit_policy: RetryPolicy,
    poll: PollConfig,
    download: DownloadOptions,
}

impl<'c> ActionExecutor<'c> {
    pub fn new(ctx: &'c ConnectionContext) -> Self {
        Self {
            ctx,
            submit_policy: RetryPolicy::transport(DEFAULT_RETRY_COUNT),
            poll: PollConfig::default(),
            download: DownloadOptions::default(),
        }
    }

    /// Submission attempts, 1 second apart.
    pub fn with_retry_count(self, retry_count: u32) -> Self {
        self.with_submit_policy(RetryPolicy::transport(retry_count))
    }

    pub fn with_submit_policy(mut self, policy: RetryPolicy) -> Self {
        self.submit_policy = policy;
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Options for fetching export payloads.
    pub fn with_download_options(mut self, options: DownloadOptions) -> Self {
        self.download = options;
        self
    }

    pub fn context(&self) -> &ConnectionContext {
        self.ctx
    }

    /// Submits `action_id`, inferring its kind from the id.
    pub async fn submit(&self, action_id: &str) -> Result<TaskHandle, TaskError> {
        self.submit_kind(kind_of(action_id)?, action_id).await
    }

    /// Submits `action_id` as `kind`.
    ///
    /// Transport failures and 5xx answers are retried per the submit policy.
    /// A 409 or 423 means the action is busy and yields
    /// [`TaskError::NotReady`].
    pub async fn submit_kind(
        &self,
        kind: ActionKind,
        action_id: &str,
    ) -> Result<TaskHandle, TaskError> {
        validate_target_id(action_id)?;
        let tasks_url = format!(
            "{}/{}/{action_id}/tasks",
            self.ctx.model_url(),
            kind.path_segment()
        );
        let body = TaskSubmitRequest::default();

        let response: TaskSubmitResponse = self
            .submit_policy
            .run(
                "submit",
                |attempt| {
                    let url = tasks_url.as_str();
                    let body = &body;
                    async move {
                        debug!(action_id, attempt, "submitting task");
                        self.ctx.post_json(url, body).await
                    }
                },
                ApiError::is_transient,
            )
            .await
            .map_err(|e| busy_or(action_id, e))?;

        let task_id = response.task.task_id;
        if task_id.is_empty() {
            return Err(TaskError::MalformedStatus(format!(
                "submission of {action_id} returned no task id"
            )));
        }
        info!(action_id, kind = %kind, task_id = %task_id, "task submitted");

        Ok(TaskHandle {
            status_url: format!("{tasks_url}/{task_id}"),
            task_id,
            action_id: action_id.to_string(),
            kind,
        })
    }

    /// Polls the task until the server reports a terminal state and returns
    /// that status document.
    pub async fn poll(&self, handle: &TaskHandle) -> Result<serde_json::Value, TaskError> {
        let started = Instant::now();
        info!(task_id = %handle.task_id, "polling task");
        loop {
            let raw: serde_json::Value = self.ctx.get_json(&handle.status_url).await?;
            let status = TaskInfo::from_value(&raw)
                .map_err(|e| TaskError::MalformedStatus(e.to_string()))?;
            debug!(
                task_id = %handle.task_id,
                state = %status.task_state,
                step = %status.current_step,
                "task status"
            );

            if status.is_terminal() {
                if status.is_failed() {
                    warn!(task_id = %handle.task_id, action_id = %handle.action_id, "task failed");
                } else {
                    info!(task_id = %handle.task_id, step = %status.current_step, "task complete");
                }
                return Ok(raw);
            }

            if let Some(limit) = self.poll.timeout {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(TaskError::PollTimeout {
                        task_id: handle.task_id.clone(),
                        elapsed,
                    });
                }
            }
            tokio::time::sleep(self.poll.interval).await;
        }
    }

    /// Submits, polls and parses. A failed task comes back as a result with
    /// [`TaskResult::is_failed`] set.
    pub async fn run(&self, action_id: &str) -> Result<TaskResult, TaskError> {
        self.run_kind(kind_of(action_id)?, action_id).await
    }

    pub async fn run_kind(
        &self,
        kind: ActionKind,
        action_id: &str,
    ) -> Result<TaskResult, TaskError> {
        let handle = self.submit_kind(kind, action_id).await?;
        let raw = self.poll(&handle).await?;
        parser::parse(kind, self.ctx, &raw, &handle.status_url, &self.download).await
    }

    /// Like [`run`](Self::run), but a failed task is an error.
    pub async fn execute(&self, action_id: &str) -> Result<TaskResult, TaskError> {
        let result = self.run(action_id).await?;
        if result.is_failed() {
            return Err(TaskError::TaskFailed {
                action_id: action_id.to_string(),
                detail: result.detail(),
            });
        }
        Ok(result)
    }
}

/// Runs `action_id` with `retry_count` submission attempts.
pub async fn execute_action(
    ctx: &ConnectionContext,
    action_id: &str,
    retry_count: u32,
) -> Result<TaskResult, TaskError> {
    ActionExecutor::new(ctx)
        .with_retry_count(retry_count)
        .execute(action_id)
        .await
}

fn kind_of(action_id: &str) -> Result<ActionKind, TaskError> {
    ActionKind::from_action_id(action_id)
        .ok_or_else(|| TaskError::UnknownActionType(action_id.to_string()))
}

fn busy_or(action_id: &str, err: ApiError) -> TaskError {
    match err {
        ApiError::Status { status, body } if status == 409 || status == 423 => {
            TaskError::NotReady {
                action_id: action_id.to_string(),
                status,
                body,
            }
        }
        other => other.into(),
    }
}

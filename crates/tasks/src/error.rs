use std::time::Duration;

use planlink_connection::ApiError;
use planlink_protocol::ErrorKind;
use planlink_transfer::TransferError;

/// Errors from running an action.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("unknown action type for id {0}")]
    UnknownActionType(String),

    #[error("action {0} is not an export")]
    NotAnExport(String),

    #[error("action {action_id} is not ready (HTTP {status}): {body}")]
    NotReady {
        action_id: String,
        status: u16,
        body: String,
    },

    #[error("action {action_id} failed: {detail}")]
    TaskFailed { action_id: String, detail: String },

    #[error("export task {0} finished without an object id")]
    MissingObjectId(String),

    #[error("task {task_id} still running after {elapsed:?}")]
    PollTimeout { task_id: String, elapsed: Duration },

    #[error("malformed task status: {0}")]
    MalformedStatus(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("error dump unreadable: {0}")]
    Dump(#[from] csv::Error),
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownActionType(_) | Self::NotAnExport(_) => ErrorKind::Usage,
            Self::NotReady { .. } | Self::PollTimeout { .. } => ErrorKind::Transport,
            Self::TaskFailed { .. }
            | Self::MissingObjectId(_)
            | Self::MalformedStatus(_)
            | Self::Dump(_) => ErrorKind::Protocol,
            Self::Api(e) => e.kind(),
            Self::Transfer(e) => e.kind(),
        }
    }

    /// The action could not start yet and may be resubmitted.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

//! Unified error type.

use planlink_auth::AuthError;
use planlink_connection::ApiError;
use planlink_protocol::ErrorKind;
use planlink_tasks::TaskError;
use planlink_transfer::TransferError;

/// Any failure of a [`Session`](crate::Session) operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("connection to workspace {workspace_id} model {model_id} is not usable")]
    ConnectionUnusable {
        workspace_id: String,
        model_id: String,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("{failed} of {total} steps failed")]
    BatchFailed { failed: usize, total: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(e) => e.kind(),
            Self::ConnectionUnusable { .. } => ErrorKind::Authentication,
            Self::Api(e) => e.kind(),
            Self::Transfer(e) => e.kind(),
            Self::Task(e) => e.kind(),
            Self::BatchFailed { .. } => ErrorKind::Protocol,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

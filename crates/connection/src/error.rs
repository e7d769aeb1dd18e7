//! Error types for API calls.

use planlink_protocol::ErrorKind;

/// Errors produced by a single API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token rejected by server (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid header value")]
    InvalidHeader,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(e) if e.is_decode() => ErrorKind::Protocol,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Unauthorized { .. } => ErrorKind::Authentication,
            Self::Status { .. } | Self::Json(_) => ErrorKind::Protocol,
            Self::InvalidHeader => ErrorKind::Usage,
        }
    }

    /// Failures worth another attempt: transport errors and 5xx responses.
    /// A body that fails to decode is not retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => !e.is_decode(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status } | Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

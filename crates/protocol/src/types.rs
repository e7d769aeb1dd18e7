use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{RESOURCE_ID_LEN, TOKEN_SCHEME};

/// Bearer token issued by the authentication service.
///
/// Replaced wholesale on rotation; the value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Raw token value as issued by the server.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Local view of expiry. The server decides; this is only a hint.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Value for the `Authorization` header of API requests.
    pub fn authorization_header(&self) -> String {
        format!("{TOKEN_SCHEME} {}", self.value)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Kind of server-side action, determined by the action id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Import,
    Export,
    Delete,
    Process,
}

impl ActionKind {
    /// Infers the kind from the numeric prefix of an action id.
    ///
    /// `112…` imports, `116…` exports, `117…` delete actions, `118…` processes.
    pub fn from_action_id(action_id: &str) -> Option<Self> {
        match action_id.get(..3)? {
            "112" => Some(Self::Import),
            "116" => Some(Self::Export),
            "117" => Some(Self::Delete),
            "118" => Some(Self::Process),
            _ => None,
        }
    }

    /// URL path segment for this kind under a model.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Import => "imports",
            Self::Export => "exports",
            Self::Delete => "actions",
            Self::Process => "processes",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Import => "import",
            Self::Export => "export",
            Self::Delete => "delete",
            Self::Process => "process",
        };
        f.write_str(s)
    }
}

/// Coarse error taxonomy shared by every crate in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad credentials, signing failure, unreadable certificate. Never retried.
    Authentication,
    /// Timeouts, resets, refused connections. Retried up to a bound.
    Transport,
    /// Unexpected response shape or a server-reported failure.
    Protocol,
    /// Caller mistake: missing file, invalid parameter.
    Usage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Authentication => "authentication",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Usage => "usage",
        };
        f.write_str(s)
    }
}

/// Returns `true` if `id` looks like a workspace or model id (32 hex chars).
pub fn is_resource_id(id: &str) -> bool {
    id.len() == RESOURCE_ID_LEN && hex::decode(id).is_ok()
}

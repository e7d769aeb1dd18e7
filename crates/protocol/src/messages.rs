use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{DEFAULT_LOCALE, STEP_COMPLETE, STEP_FAILED};

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Body of the certificate authentication request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    /// Base64 of the raw nonce.
    pub encoded_data: String,
    /// Base64 of the nonce signature.
    pub encoded_signed_data: String,
}

/// Response of the authentication service.
///
/// The token normally arrives under `tokenInfo`; a flat `tokenValue` /
/// `tokenExpiry` pair is accepted as well.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub token_info: Option<TokenInfo>,
    #[serde(default)]
    pub token_value: Option<String>,
    #[serde(default)]
    pub token_expiry: Option<i64>,
}

/// Token details returned on successful authentication.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub token_value: String,
    /// Expiry as Unix epoch milliseconds.
    #[serde(alias = "tokenExpiry")]
    pub expires_at: i64,
}

impl AuthResponse {
    /// `true` unless the server explicitly reported a non-success status.
    pub fn is_success(&self) -> bool {
        self.status.is_empty() || self.status.eq_ignore_ascii_case("SUCCESS")
    }

    /// Returns `(token value, expiry millis)` from whichever layout was used.
    pub fn token(&self) -> Option<(&str, i64)> {
        if let Some(info) = &self.token_info {
            return Some((info.token_value.as_str(), info.expires_at));
        }
        match (&self.token_value, self.token_expiry) {
            (Some(value), Some(expiry)) => Some((value.as_str(), expiry)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Metadata sent when declaring or completing an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: String,
    /// `-1` while the chunk count is not yet announced.
    pub chunk_count: i64,
}

impl FileMetadata {
    pub fn declare(id: &str) -> Self {
        Self {
            id: id.to_string(),
            chunk_count: -1,
        }
    }

    pub fn complete(id: &str, chunk_count: u64) -> Self {
        Self {
            id: id.to_string(),
            chunk_count: chunk_count as i64,
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Body of a task submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmitRequest {
    pub locale_name: String,
}

impl Default for TaskSubmitRequest {
    fn default() -> Self {
        Self {
            locale_name: DEFAULT_LOCALE.into(),
        }
    }
}

/// Response of a task submission.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskSubmitResponse {
    pub task: TaskRef,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub task_id: String,
}

/// Status of a running or finished task.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub task_state: String,
    #[serde(default)]
    pub current_step: String,
    #[serde(default)]
    pub result: Option<TaskResultBody>,
}

impl TaskInfo {
    /// Extracts the task object from a status response.
    ///
    /// Accepts both `{"task": {...}}` and the bare object.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let inner = value.get("task").unwrap_or(value);
        serde_json::from_value(inner.clone())
    }

    pub fn is_failed(&self) -> bool {
        self.current_step == STEP_FAILED
    }

    /// `true` once the server stops working on the task.
    pub fn is_terminal(&self) -> bool {
        matches!(self.task_state.as_str(), "COMPLETE" | "CANCELLED")
            || self.current_step == STEP_COMPLETE
            || self.is_failed()
    }

    /// Dump flag of the top-level result (false when no result yet).
    pub fn failure_dump_available(&self) -> bool {
        self.result
            .as_ref()
            .is_some_and(|r| r.failure_dump_available)
    }
}

/// `result` object of a finished task.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResultBody {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub successful: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub failure_dump_available: bool,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub details: Vec<ResultDetail>,
    #[serde(default)]
    pub nested_results: Vec<NestedResultBody>,
}

/// One message line of a task result.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDetail {
    #[serde(default)]
    pub local_message_text: String,
    #[serde(default)]
    pub occurrences: i64,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Result of one step of a process action.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedResultBody {
    #[serde(default)]
    pub object_id: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub successful: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub failure_dump_available: bool,
    #[serde(default)]
    pub details: Vec<ResultDetail>,
}

/// Accepts `true`, `"true"`, `"True"` and friends.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Text(String),
    }

    match BoolLike::deserialize(deserializer)? {
        BoolLike::Bool(b) => Ok(b),
        BoolLike::Text(s) => Ok(matches!(
            s.to_ascii_lowercase().as_str(),
            "true" | "t" | "yes" | "y" | "1" | "on"
        )),
    }
}

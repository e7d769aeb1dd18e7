pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use messages::{
    AuthRequest, AuthResponse, FileMetadata, NestedResultBody, ResultDetail, TaskInfo,
    TaskResultBody, TaskSubmitRequest, TaskSubmitResponse,
};
pub use types::{ActionKind, AuthToken, ErrorKind, is_resource_id};

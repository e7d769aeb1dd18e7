//! Server-side actions: submission, polling and result parsing.
//!
//! An action id's prefix selects its kind (import, export, delete action or
//! process). [`ActionExecutor`] submits the action, polls the resulting task
//! until it settles and turns the final status into a [`TaskResult`],
//! fetching error dumps and export payloads along the way.

mod download;
mod error;
mod executor;
pub mod parser;
mod result;

pub use download::{download, download_with};
pub use error::TaskError;
pub use executor::{ActionExecutor, DEFAULT_RETRY_COUNT, PollConfig, TaskHandle, execute_action};
pub use result::{ErrorDump, NestedResult, TaskResult};

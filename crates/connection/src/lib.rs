//! Connection layer for the planning-platform integration API.
//!
//! [`ApiClient`] owns the HTTP client and base URLs, [`ConnectionContext`]
//! binds it to a token and a workspace/model pair, and [`RetryPolicy`]
//! bounds how long a fresh token is given to become usable.

pub mod client;
pub mod context;
pub mod error;
pub mod retry;

pub use client::{ApiClient, Endpoints, check_status};
pub use context::ConnectionContext;
pub use error::ApiError;
pub use retry::RetryPolicy;

use std::time::Duration;

/// Default certificate authentication endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://auth.anaplan.com/token/authenticate";

/// Default base URL of the integration API (version 2.0).
pub const DEFAULT_API_BASE: &str = "https://api.anaplan.com/2/0";

/// Scheme tag prefixed to the base64 certificate in the auth request.
pub const CERTIFICATE_SCHEME: &str = "CACertificate";

/// Scheme tag prefixed to the bearer token on every API request.
pub const TOKEN_SCHEME: &str = "AnaplanAuthToken";

/// Number of random bytes signed during certificate authentication.
pub const NONCE_LEN: usize = 150;

/// Connect timeout for every API call.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Overall (read) timeout for every API call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `currentStep` value reported by a task that failed.
pub const STEP_FAILED: &str = "Failed.";

/// `currentStep` value reported by a task that finished.
pub const STEP_COMPLETE: &str = "Complete.";

/// Detail attached to a successful export result.
pub const EXPORT_COMPLETED: &str = "File export completed.";

/// Locale sent with every task submission.
pub const DEFAULT_LOCALE: &str = "en_US";

/// Smallest accepted upload chunk size in MiB.
pub const MIN_CHUNK_MB: u32 = 1;

/// Largest accepted upload chunk size in MiB.
pub const MAX_CHUNK_MB: u32 = 50;

/// Length of workspace and model identifiers (hex characters).
pub const RESOURCE_ID_LEN: usize = 32;

//! Client for the planning-platform integration API.
//!
//! A [`Session`] authenticates with a certificate and RSA key, confirms the
//! token is accepted by one model and then exposes the operations callers
//! need: upload a file, run an action, download an export.
//!
//! ```no_run
//! # async fn demo() -> planlink::Result<()> {
//! use planlink::{AuthSettings, Endpoints, Session};
//!
//! let settings = AuthSettings::new("cert.pem", "key.pem");
//! let session = Session::connect(&settings, Endpoints::default(), "ws", "model").await?;
//! session.upload("113000000001", std::path::PathBuf::from("data.csv")).await?;
//! session.execute_action("112000000001").await?;
//! let csv = session.download("116000000001").await?;
//! # let _ = csv;
//! # Ok(())
//! # }
//! ```

mod batch;
mod error;
mod session;
mod settings;

pub use batch::{BatchReport, StepOutcome, StepRecord, log_outcome};
pub use error::{Error, Result};
pub use session::Session;
pub use settings::AuthSettings;

pub use planlink_auth::PassphraseSource;
pub use planlink_connection::{ApiClient, Endpoints, RetryPolicy};
pub use planlink_protocol::{ActionKind, ErrorKind};
pub use planlink_tasks::{ErrorDump, NestedResult, PollConfig, TaskResult};
pub use planlink_transfer::{DownloadOptions, DownloadedObject, UploadOutcome, UploadSource};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock};

    use planlink_test_support::{MockResponse, MockServer, RecordedRequest};
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};

    use crate::AuthSettings;

    const CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----\n\
        MIIBszCCAVmgAwIBAgIUYWJjZGVmZ2hpamtsbW5vcHFyc3R1dnd4eXowCgYIKoZI\n\
        -----END CERTIFICATE-----\n";

    fn key_pem() -> &'static str {
        static PEM: OnceLock<String> = OnceLock::new();
        PEM.get_or_init(|| {
            let key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
            key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string()
        })
    }

    pub fn auth_settings() -> AuthSettings {
        AuthSettings::new(CERTIFICATE, key_pem())
    }

    /// Successful authentication answer carrying token `tok-{n}`.
    pub fn token_response(n: usize) -> MockResponse {
        let expires = chrono::Utc::now().timestamp_millis() + 30 * 60 * 1000;
        MockResponse::json(
            200,
            &format!(
                r#"{{"status":"SUCCESS","tokenInfo":{{"tokenValue":"tok-{n}","expiresAt":{expires}}}}}"#
            ),
        )
    }

    /// Server issuing `tok-1`, `tok-2`, ... and accepting every token for
    /// model `ws1/m1`; all other requests go to `handler`.
    pub async fn model_server<F>(handler: F) -> MockServer
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let issued = Arc::new(AtomicUsize::new(0));
        MockServer::start(move |req| {
            if req.path == "/token/authenticate" {
                return token_response(issued.fetch_add(1, Ordering::SeqCst) + 1);
            }
            if req.method == "GET" && req.path == "/2/0/workspaces/ws1/models/m1/files" {
                return MockResponse::json(200, r#"{"files":[]}"#);
            }
            handler(req)
        })
        .await
    }
}

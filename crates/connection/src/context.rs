//! Authenticated connection to one workspace/model pair.

use planlink_protocol::AuthToken;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue, RANGE};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::retry::RetryPolicy;

/// Everything needed to talk to one model: client, token, identifiers.
///
/// Read-only during a transfer, so concurrent workers may share it by
/// reference. The token is only replaced through [`set_token`](Self::set_token).
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    api: ApiClient,
    token: AuthToken,
    workspace_id: String,
    model_id: String,
    warmup: RetryPolicy,
}

impl ConnectionContext {
    pub fn new(
        api: ApiClient,
        token: AuthToken,
        workspace_id: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            token,
            workspace_id: workspace_id.into(),
            model_id: model_id.into(),
            warmup: RetryPolicy::token_warmup(),
        }
    }

    /// Overrides the policy used by [`validate`](Self::validate).
    pub fn with_validation_policy(mut self, policy: RetryPolicy) -> Self {
        self.warmup = policy;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    pub fn set_token(&mut self, token: AuthToken) {
        self.token = token;
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn validation_policy(&self) -> RetryPolicy {
        self.warmup
    }

    // -----------------------------------------------------------------------
    // URLs
    // -----------------------------------------------------------------------

    /// `{api_base}/workspaces/{ws}/models/{model}`
    pub fn model_url(&self) -> String {
        format!(
            "{}/workspaces/{}/models/{}",
            self.api.endpoints().api_base.trim_end_matches('/'),
            self.workspace_id,
            self.model_id
        )
    }

    pub fn files_url(&self) -> String {
        format!("{}/files", self.model_url())
    }

    pub fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{file_id}", self.model_url())
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Request builder carrying the current token.
    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ApiError> {
        let auth = HeaderValue::from_str(&self.token.authorization_header())
            .map_err(|_| ApiError::InvalidHeader)?;
        Ok(self
            .api
            .http()
            .request(method, url)
            .header(AUTHORIZATION, auth))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let body = self.get_bytes(url).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let resp = self.api.send(self.request(Method::GET, url)?).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// GET with a `Range: bytes=start-end` header (inclusive). The status is
    /// left for the caller to interpret.
    pub async fn get_range(&self, url: &str, start: u64, end: u64) -> Result<Response, ApiError> {
        let req = self
            .request(Method::GET, url)?
            .header(RANGE, format!("bytes={start}-{end}"));
        self.api.send_raw(req).await
    }

    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let req = self.request(Method::PUT, url)?.json(body);
        self.api.send(req).await?;
        Ok(())
    }

    pub async fn put_bytes(&self, url: &str, body: Vec<u8>) -> Result<(), ApiError> {
        let req = self
            .request(Method::PUT, url)?
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body);
        self.api.send(req).await?;
        Ok(())
    }

    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(Method::POST, url)?.json(body);
        let resp = self.api.send(req).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Waits until the server accepts the token for this model.
    ///
    /// Issues a cheap authenticated GET of the model's file list. Transport
    /// errors and 5xx responses are retried per the validation policy; a 4xx
    /// answer ends validation at once. Returns the token that was accepted,
    /// or `None` when the connection is not usable.
    pub async fn validate(&self) -> Option<AuthToken> {
        let url = self.files_url();
        let result = self
            .warmup
            .run(
                "validate",
                |attempt| {
                    let req = self.request(Method::GET, &url);
                    async move {
                        debug!(attempt, "validating connection");
                        self.api.send(req?).await?;
                        Ok::<(), ApiError>(())
                    }
                },
                ApiError::is_transient,
            )
            .await;

        match result {
            Ok(()) => {
                info!(
                    workspace = %self.workspace_id,
                    model = %self.model_id,
                    "connection validated"
                );
                Some(self.token.clone())
            }
            Err(ApiError::Unauthorized { status }) => {
                warn!(status, "token rejected during validation");
                None
            }
            Err(e) => {
                warn!(error = %e, "connection validation failed");
                None
            }
        }
    }
}

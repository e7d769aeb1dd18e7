//! Exchange of a signed nonce for an API token.

use chrono::DateTime;
use planlink_connection::ApiClient;
use planlink_protocol::{AuthResponse, AuthToken};
use reqwest::header::AUTHORIZATION;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::material::CredentialMaterial;
use crate::passphrase::PassphraseSource;
use crate::signer::{new_nonce, sign_request};

/// Talks to the authentication service.
#[derive(Debug, Clone)]
pub struct Authenticator {
    api: ApiClient,
}

impl Authenticator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Signs a fresh nonce with the material's key and trades it for a token.
    pub async fn authenticate(
        &self,
        material: &CredentialMaterial,
    ) -> Result<AuthToken, AuthError> {
        let key = material.decode_key()?;
        let nonce = new_nonce();
        let body = sign_request(&key, &nonce)?;
        drop(key);

        let url = &self.api.endpoints().auth_url;
        debug!(url = %url, "requesting token");

        let resp = self
            .api
            .http()
            .post(url)
            .header(AUTHORIZATION, material.certificate_header())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            let message = server_message(&text).unwrap_or_else(|| format!("HTTP {status}"));
            warn!(status = status.as_u16(), "authentication rejected");
            return Err(AuthError::Rejected(message));
        }

        let parsed: AuthResponse = serde_json::from_str(&text)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        if !parsed.is_success() {
            let message = if parsed.status_message.is_empty() {
                parsed.status.clone()
            } else {
                parsed.status_message.clone()
            };
            return Err(AuthError::Rejected(message));
        }

        let (value, expiry_ms) = parsed
            .token()
            .ok_or_else(|| AuthError::MalformedResponse("no token in response".into()))?;
        if value.is_empty() {
            return Err(AuthError::MalformedResponse("empty token value".into()));
        }
        let expires_at = DateTime::from_timestamp_millis(expiry_ms)
            .ok_or_else(|| AuthError::MalformedResponse(format!("bad expiry {expiry_ms}")))?;

        info!(expires_at = %expires_at, "authenticated");
        Ok(AuthToken::new(value, expires_at))
    }
}

/// Loads credentials and authenticates in one call.
pub async fn authenticate(
    api: &ApiClient,
    certificate: &str,
    private_key: &str,
    passphrase: PassphraseSource,
) -> Result<AuthToken, AuthError> {
    let material = CredentialMaterial::load(certificate, private_key, passphrase)?;
    Authenticator::new(api.clone()).authenticate(&material).await
}

fn server_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = value.get("statusMessage").and_then(|m| m.as_str()) {
            return Some(msg.to_string());
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

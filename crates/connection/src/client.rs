//! Planning-platform HTTP client.
//!
//! Thin wrapper around `reqwest` that fixes timeouts, knows the service
//! base URLs and maps non-2xx responses onto [`ApiError`].

use std::time::Duration;

use planlink_protocol::constants::{
    CONNECT_TIMEOUT, DEFAULT_API_BASE, DEFAULT_AUTH_URL, REQUEST_TIMEOUT,
};
use reqwest::{RequestBuilder, Response, StatusCode};

use crate::error::ApiError;

/// Base URLs of the authentication service and the integration API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    pub api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Endpoints {
    /// Points both services at one server, e.g. a local mock.
    pub fn local(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{base}/token/authenticate"),
            api_base: format!("{base}/2/0"),
        }
    }
}

/// Shared HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ApiClient {
    /// Creates a client with the default 5s connect / 30s request timeouts.
    pub fn new(endpoints: Endpoints) -> Result<Self, ApiError> {
        Self::with_timeouts(endpoints, CONNECT_TIMEOUT, REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(
        endpoints: Endpoints,
        connect: Duration,
        total: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect)
            .timeout(total)
            .build()?;
        Ok(Self { http, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends a request and fails on any non-2xx status.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let resp = self.send_raw(request).await?;
        check_status(resp).await
    }

    /// Sends a request without looking at the status code.
    pub async fn send_raw(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        Ok(request.send().await?)
    }
}

/// Maps 401/403 to [`ApiError::Unauthorized`] and other non-2xx codes to
/// [`ApiError::Status`] carrying the response body.
pub async fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Unauthorized {
            status: status.as_u16(),
        });
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use planlink_test_support::{MockResponse, MockServer};

    #[test]
    fn default_endpoints() {
        let ep = Endpoints::default();
        assert_eq!(ep.auth_url, "https://auth.anaplan.com/token/authenticate");
        assert_eq!(ep.api_base, "https://api.anaplan.com/2/0");
    }

    #[test]
    fn local_endpoints_trim_slash() {
        let ep = Endpoints::local("http://127.0.0.1:9000/");
        assert_eq!(ep.auth_url, "http://127.0.0.1:9000/token/authenticate");
        assert_eq!(ep.api_base, "http://127.0.0.1:9000/2/0");
    }

    #[tokio::test]
    async fn maps_forbidden_to_unauthorized() {
        let server = MockServer::always(MockResponse::text(403, "denied")).await;
        let client = ApiClient::new(Endpoints::local(server.url())).unwrap();

        let err = client
            .send(client.http().get(server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { status: 403 }));
    }

    #[tokio::test]
    async fn keeps_error_body() {
        let server = MockServer::always(MockResponse::text(404, "no such model")).await;
        let client = ApiClient::new(Endpoints::local(server.url())).unwrap();

        let err = client
            .send(client.http().get(server.url()))
            .await
            .unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such model");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn raw_send_ignores_status() {
        let server = MockServer::always(MockResponse::status(416)).await;
        let client = ApiClient::new(Endpoints::local(server.url())).unwrap();

        let resp = client
            .send_raw(client.http().get(server.url()))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 416);
    }
}

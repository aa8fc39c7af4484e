//! OAuth2 token endpoint calls.
//!
//! Two grants are used, each as a single form-encoded POST with no retry:
//!
//! | Grant | Extra fields |
//! |-------|--------------|
//! | `refresh_token` | `refresh_token` |
//! | `authorization_code` | `code` |
//!
//! Both also send `client_id`, `client_secret` and `scope`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Error, Result};

use super::credentials::OAuthCredential;

// ============================================================================
// Constants
// ============================================================================

/// Discord's token endpoint.
pub const TOKEN_URL: &str = "https://discord.com/api/oauth2/token";

/// Scopes requested by default.
pub const DEFAULT_SCOPES: &[&str] = &["rpc", "identify"];

/// Default HTTP timeout per call.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// TokenExchange
// ============================================================================

/// Performs the OAuth2 token calls made during `connect()`.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Trades a refresh token for a new credential.
    async fn refresh(&self, refresh_token: &str) -> Result<OAuthCredential>;

    /// Trades an authorization code for a credential.
    async fn exchange_code(&self, code: &str) -> Result<OAuthCredential>;
}

// ============================================================================
// HttpTokenExchange
// ============================================================================

/// [`TokenExchange`] against an HTTP token endpoint.
#[derive(Clone)]
pub struct HttpTokenExchange {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    scopes: Vec<String>,
    token_url: String,
    timeout: Duration,
}

impl HttpTokenExchange {
    /// Creates an exchange for one application.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            token_url: TOKEN_URL.to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Overrides the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Overrides the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Overrides the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Token endpoint in use.
    #[inline]
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Posts one grant and parses the credential.
    async fn post(&self, grant: &[(&str, &str)]) -> Result<OAuthCredential> {
        let url = Url::parse(&self.token_url)
            .map_err(|e| Error::config(format!("Invalid token URL {}: {e}", self.token_url)))?;

        let scope = self.scopes.join(" ");
        let mut fields = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        fields.extend_from_slice(grant);
        fields.push(("scope", scope.as_str()));

        let resp = self
            .http
            .post(url)
            .timeout(self.timeout)
            .form(&fields)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(Error::OAuth {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = resp.json().await?;
        debug!(status = status.as_u16(), "Token endpoint answered");
        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<OAuthCredential> {
        self.post(&[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<OAuthCredential> {
        self.post(&[("code", code), ("grant_type", "authorization_code")])
            .await
    }
}

impl fmt::Debug for HttpTokenExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTokenExchange")
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("token_url", &self.token_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn exchange(server: &MockServer) -> HttpTokenExchange {
        HttpTokenExchange::new("123", "s3cret")
            .with_token_url(format!("{}/api/oauth2/token", server.uri()))
    }

    #[tokio::test]
    async fn test_form_fields_are_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("code=a%26b%3Dc"))
            .and(body_string_contains("scope=rpc+identify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = exchange(&server)
            .exchange_code("a&b=c")
            .await
            .expect("exchange");
        assert_eq!(credential.access_token(), Some("access"));
    }

    #[tokio::test]
    async fn test_refresh_posts_refresh_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/oauth2/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .and(body_string_contains("client_id=123"))
            .and(body_string_contains("client_secret=s3cret"))
            .and(body_string_contains("scope=rpc+identify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_in": 604800
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = exchange(&server)
            .refresh("old-refresh")
            .await
            .expect("refresh");

        assert_eq!(credential.access_token(), Some("new-access"));
        assert_eq!(credential.refresh_token(), Some("new-refresh"));
        assert_eq!(credential.extra["expires_in"], 604800);
    }

    #[tokio::test]
    async fn test_exchange_code_posts_code_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/oauth2/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access",
                "refresh_token": "refresh"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = exchange(&server)
            .exchange_code("the-code")
            .await
            .expect("exchange");

        assert_eq!(credential.access_token(), Some("access"));
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        match exchange(&server).refresh("stale").await {
            Err(Error::OAuth { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid_grant");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_access_token_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
            .mount(&server)
            .await;

        let credential = exchange(&server)
            .exchange_code("code")
            .await
            .expect("exchange");
        assert_eq!(credential.access_token(), None);
    }

    #[tokio::test]
    async fn test_invalid_token_url() {
        let result = HttpTokenExchange::new("1", "2")
            .with_token_url("not a url")
            .refresh("r")
            .await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}

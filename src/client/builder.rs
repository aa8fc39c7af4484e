//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use discord_ipc::Client;
//!
//! # fn example() -> discord_ipc::Result<()> {
//! let client = Client::builder()
//!     .client_id("123456789012345678")
//!     .client_secret("secret")
//!     .credential_path("discordOauth.json")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use crate::auth::{
    CredentialStore, DEFAULT_CREDENTIAL_FILE, DEFAULT_SCOPES, FileCredentialStore,
    HttpTokenExchange, TOKEN_URL, TokenExchange,
};
use crate::error::{Error, Result};
use crate::transport::{Connector, Dispatcher, LocalSocketConnector, endpoint};

use super::core::{Client, ClientInner};
use super::options::ClientOptions;
use super::session::Session;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable read by [`ClientBuilder::from_env`] for the client id.
pub const CLIENT_ID_ENV: &str = "DISCORD_CLIENT_ID";

/// Environment variable read by [`ClientBuilder::from_env`] for the secret.
pub const CLIENT_SECRET_ENV: &str = "DISCORD_CLIENT_SECRET";

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    scopes: Option<Vec<String>>,
    credential_path: Option<PathBuf>,
    credential_store: Option<Arc<dyn CredentialStore>>,
    token_url: Option<String>,
    token_exchange: Option<Arc<dyn TokenExchange>>,
    connector: Option<Arc<dyn Connector>>,
    endpoint_dir: Option<PathBuf>,
    options: ClientOptions,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder with the id and secret taken from
    /// `DISCORD_CLIENT_ID` and `DISCORD_CLIENT_SECRET`, when set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        builder.client_id = std::env::var(CLIENT_ID_ENV).ok();
        builder.client_secret = std::env::var(CLIENT_SECRET_ENV).ok();
        builder
    }

    /// Sets the application's client id.
    #[inline]
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the application's client secret.
    #[inline]
    #[must_use]
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Overrides the OAuth2 scopes (default `rpc identify`).
    #[must_use]
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Stores the credential in a JSON file at `path`.
    ///
    /// Ignored when [`credential_store`](Self::credential_store) is set.
    #[inline]
    #[must_use]
    pub fn credential_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_path = Some(path.into());
        self
    }

    /// Uses a custom credential store.
    #[inline]
    #[must_use]
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    /// Overrides the OAuth2 token endpoint.
    ///
    /// Ignored when [`token_exchange`](Self::token_exchange) is set.
    #[inline]
    #[must_use]
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Uses a custom token exchange.
    #[inline]
    #[must_use]
    pub fn token_exchange(mut self, exchange: Arc<dyn TokenExchange>) -> Self {
        self.token_exchange = Some(exchange);
        self
    }

    /// Uses a custom IPC connector.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Overrides the directory holding the `discord-ipc-N` endpoints.
    #[inline]
    #[must_use]
    pub fn endpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.endpoint_dir = Some(dir.into());
        self
    }

    /// Sets timeouts and limits.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the client id or secret is missing or empty
    /// - [`Error::Config`] if the token URL does not parse
    pub fn build(self) -> Result<Client> {
        let (client_id, client_secret) = self.validate_credentials()?;
        let token_url = self.validate_token_url()?;

        let scopes = self
            .scopes
            .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(ToString::to_string).collect());

        let credentials = self.credential_store.unwrap_or_else(|| {
            let path = self
                .credential_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIAL_FILE));
            Arc::new(FileCredentialStore::new(path))
        });

        let token_exchange = self.token_exchange.unwrap_or_else(|| {
            Arc::new(
                HttpTokenExchange::new(client_id.clone(), client_secret)
                    .with_scopes(scopes.clone())
                    .with_token_url(token_url),
            )
        });

        Ok(Client::from_inner(ClientInner {
            client_id,
            scopes,
            options: self.options,
            connector: self
                .connector
                .unwrap_or_else(|| Arc::new(LocalSocketConnector)),
            endpoint_dir: self.endpoint_dir.unwrap_or_else(endpoint::default_dir),
            credentials,
            token_exchange,
            dispatcher: Dispatcher::new(),
            session: Mutex::new(Session::default()),
            connection: Mutex::new(None),
            connect_lock: tokio::sync::Mutex::new(()),
        }))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the client id and secret.
    fn validate_credentials(&self) -> Result<(String, String)> {
        let client_id = self
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Error::config(
                    "Client id is required. Use .client_id() or set DISCORD_CLIENT_ID.",
                )
            })?;

        let client_secret = self
            .client_secret
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| {
                Error::config(
                    "Client secret is required. Use .client_secret() or set DISCORD_CLIENT_SECRET.",
                )
            })?;

        Ok((client_id.to_string(), client_secret.to_string()))
    }

    /// Validates the token endpoint.
    fn validate_token_url(&self) -> Result<String> {
        let token_url = self.token_url.as_deref().unwrap_or(TOKEN_URL);
        Url::parse(token_url)
            .map_err(|e| Error::config(format!("Invalid token URL {token_url}: {e}")))?;
        Ok(token_url.to_string())
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("scopes", &self.scopes)
            .field("credential_path", &self.credential_path)
            .field("token_url", &self.token_url)
            .field("endpoint_dir", &self.endpoint_dir)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ClientBuilder::new();
        assert!(builder.client_id.is_none());
        assert!(builder.client_secret.is_none());
        assert_eq!(builder.options, ClientOptions::default());
    }

    #[test]
    fn test_missing_client_id() {
        let result = ClientBuilder::new().client_secret("secret").build();
        let err = result.expect_err("missing id");
        assert!(matches!(err, Error::Config { .. }));
        assert_eq!(err.code(), "ERR 0");
    }

    #[test]
    fn test_empty_secret() {
        let result = ClientBuilder::new()
            .client_id("123")
            .client_secret("  ")
            .build();
        assert_eq!(result.expect_err("empty secret").code(), "ERR 0");
    }

    #[test]
    fn test_invalid_token_url() {
        let result = ClientBuilder::new()
            .client_id("123")
            .client_secret("secret")
            .token_url("::not a url")
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_scopes_override() {
        let builder = ClientBuilder::new().scopes(["rpc", "rpc.voice.read"]);
        assert_eq!(
            builder.scopes,
            Some(vec!["rpc".to_string(), "rpc.voice.read".to_string()])
        );
    }

    #[test]
    fn test_build_defaults() {
        let client = ClientBuilder::new()
            .client_id(" 123 ")
            .client_secret("secret")
            .build()
            .expect("build");
        assert_eq!(client.client_id(), "123");
        assert!(!client.is_connected());
        assert_eq!(client.last_error(), None);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let builder = ClientBuilder::new().client_id("1").client_secret("s3cret");
        let debug = format!("{builder:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }
}

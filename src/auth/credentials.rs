//! Persisted OAuth2 credential.
//!
//! The credential is the token endpoint's JSON response, stored as-is:
//!
//! ```json
//! { "access_token": "...", "refresh_token": "...", "expires_in": 604800, "scope": "rpc identify", "token_type": "Bearer" }
//! ```
//!
//! It is read once per `connect()` and written wholesale after every
//! successful token call.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Default credential file, relative to the working directory.
pub const DEFAULT_CREDENTIAL_FILE: &str = "discordOauth.json";

// ============================================================================
// OAuthCredential
// ============================================================================

/// Stored OAuth2 tokens plus whatever else the token endpoint returned.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthCredential {
    /// Access token for AUTHENTICATE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Refresh token for the refresh grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Remaining response fields, kept for round-tripping.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OAuthCredential {
    /// Creates a credential from a token pair.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            extra: Map::new(),
        }
    }

    /// Access token, if present and non-empty.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Refresh token, if present and non-empty.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Returns `true` if neither token is usable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token().is_none() && self.refresh_token().is_none()
    }
}

impl fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &Option<String>| token.as_ref().map(|_| "<redacted>");
        f.debug_struct("OAuthCredential")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// CredentialStore
// ============================================================================

/// Storage for the OAuth2 credential.
pub trait CredentialStore: Send + Sync {
    /// Loads the credential. A missing or unreadable credential is empty.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures that should abort.
    fn load(&self) -> Result<OAuthCredential>;

    /// Replaces the stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be written.
    fn save(&self, credential: &OAuthCredential) -> Result<()>;

    /// Deletes the stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential exists but cannot be removed.
    fn clear(&self) -> Result<()>;
}

// ============================================================================
// FileCredentialStore
// ============================================================================

/// JSON file store.
///
/// On Unix the file is written with mode `0o600`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIAL_FILE)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<OAuthCredential> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored credential");
                return Ok(OAuthCredential::default());
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read credential file");
                return Ok(OAuthCredential::default());
            }
        };

        match serde_json::from_slice(&data) {
            Ok(credential) => Ok(credential),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to parse credential file");
                Ok(OAuthCredential::default())
            }
        }
    }

    fn save(&self, credential: &OAuthCredential) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec(credential)?;
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(&self.path, perms) {
                warn!(path = %self.path.display(), error = %e, "Failed to restrict credential file");
            }
        }

        debug!(path = %self.path.display(), "Credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// MemoryCredentialStore
// ============================================================================

/// In-process store, for callers that persist credentials themselves.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<OAuthCredential>,
}

impl MemoryCredentialStore {
    /// Creates a store holding `credential`.
    #[must_use]
    pub fn new(credential: OAuthCredential) -> Self {
        Self {
            credential: Mutex::new(credential),
        }
    }

    /// Returns a copy of the current credential.
    #[must_use]
    pub fn snapshot(&self) -> OAuthCredential {
        self.credential.lock().clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<OAuthCredential> {
        Ok(self.snapshot())
    }

    fn save(&self, credential: &OAuthCredential) -> Result<()> {
        *self.credential.lock() = credential.clone();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.credential.lock() = OAuthCredential::default();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

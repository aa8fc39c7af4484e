//! OAuth2 collaborators used by `connect()`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `credentials` | Stored token pair and its stores |
//! | `oauth` | Token endpoint calls |

// ============================================================================
// Submodules
// ============================================================================

/// Stored credential.
pub mod credentials;

/// Token endpoint calls.
pub mod oauth;

// ============================================================================
// Re-exports
// ============================================================================

pub use credentials::{
    CredentialStore, DEFAULT_CREDENTIAL_FILE, FileCredentialStore, MemoryCredentialStore,
    OAuthCredential,
};
pub use oauth::{DEFAULT_SCOPES, HttpTokenExchange, TOKEN_URL, TokenExchange};

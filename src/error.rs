//! Error types for the Discord IPC client.
//!
//! Every variant maps to a stable short code through [`Error::code`]. The
//! codes are what [`Client::last_error`](crate::Client::last_error) reports
//! after a failed or dropped connection, so they never change between
//! releases even when the display text does.
//!
//! # Error Categories
//!
//! | Category | Variants | Codes |
//! |----------|----------|-------|
//! | Configuration | [`Error::Config`] | `ERR 0` |
//! | Transport | [`Error::TransportUnavailable`], [`Error::ReadTimeout`], [`Error::TruncatedStream`], [`Error::Disconnected`] | `ERR 1`, `READ_TIMEOUT`, `TRUNCATED_STREAM`, `DISCONNECTED` |
//! | Handshake | [`Error::HandshakeMismatch`], [`Error::EmptyHandshake`] | `ERR 2`, `ERR 8` |
//! | Authentication | [`Error::AuthRefreshFailed`], [`Error::AuthorizeDenied`], [`Error::TokenExchangeFailed`], [`Error::EmptyAccessToken`], [`Error::AuthenticateFailed`] | `ERR 3` .. `ERR 7` |
//! | Protocol | [`Error::MalformedFrame`], [`Error::CommandFailed`], [`Error::Protocol`] | `MALFORMED_FRAME`, `COMMAND_FAILED`, `PROTOCOL` |
//! | External | [`Error::OAuth`], [`Error::Io`], [`Error::Json`], [`Error::Http`], [`Error::ChannelClosed`] | `OAUTH`, `IO`, `JSON`, `HTTP`, `DISCONNECTED` |

// ============================================================================
// Imports
// ============================================================================

use std::io::{Error as IoError, ErrorKind};
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Client configuration is invalid (missing client id or secret).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// No local IPC endpoint accepted a connection.
    #[error("Discord IPC unavailable after {attempts} endpoint attempts")]
    TransportUnavailable {
        /// Number of endpoints tried.
        attempts: usize,
    },

    /// Waiting for bytes or a reply exceeded its bound.
    #[error("Read timed out after {timeout_ms}ms")]
    ReadTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The stream closed before a complete frame was read.
    #[error("Stream closed mid-frame: expected {expected} bytes")]
    TruncatedStream {
        /// Number of bytes the frame still required.
        expected: usize,
    },

    /// The connection is closed or was torn down while a command was pending.
    #[error("Disconnected")]
    Disconnected,

    // ========================================================================
    // Handshake Errors
    // ========================================================================
    /// The first frame after the handshake was not the READY dispatch.
    #[error("Handshake mismatch: expected DISPATCH, got {found}")]
    HandshakeMismatch {
        /// Command name found in the first frame.
        found: String,
    },

    /// The handshake response was empty or could not be parsed.
    #[error("Empty handshake response")]
    EmptyHandshake,

    // ========================================================================
    // Authentication Errors
    // ========================================================================
    /// Refreshing the stored token failed. Connect falls through to a full
    /// authorization when this happens.
    #[error("Token refresh failed: {message}")]
    AuthRefreshFailed {
        /// Description of the refresh failure.
        message: String,
    },

    /// The AUTHORIZE command was rejected or returned an error.
    #[error("Authorization denied: {message}")]
    AuthorizeDenied {
        /// Description of the denial.
        message: String,
    },

    /// Exchanging the authorization code for tokens failed.
    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed {
        /// Description of the exchange failure.
        message: String,
    },

    /// The token endpoint answered without an access token.
    #[error("Token endpoint returned no access token")]
    EmptyAccessToken,

    /// The AUTHENTICATE command was rejected or returned an error.
    #[error("Authentication failed: {message}")]
    AuthenticateFailed {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// A frame payload was not a valid JSON object.
    #[error("Malformed frame: {message}")]
    MalformedFrame {
        /// Parser diagnostic.
        message: String,
    },

    /// A command reply was classified as an ERROR event.
    #[error("Command failed ({code}): {message}")]
    CommandFailed {
        /// Discord RPC error code (0 if absent).
        code: i64,
        /// Error message from Discord.
        message: String,
    },

    /// Protocol violation or local limit exceeded.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// The OAuth2 token endpoint answered with a non-success status.
    #[error("OAuth error ({status}): {message}")]
    OAuth {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a transport unavailable error.
    #[inline]
    pub fn transport_unavailable(attempts: usize) -> Self {
        Self::TransportUnavailable { attempts }
    }

    /// Creates a read timeout error.
    #[inline]
    pub fn read_timeout(timeout_ms: u64) -> Self {
        Self::ReadTimeout { timeout_ms }
    }

    /// Creates a truncated stream error.
    #[inline]
    pub fn truncated_stream(expected: usize) -> Self {
        Self::TruncatedStream { expected }
    }

    /// Creates a handshake mismatch error.
    #[inline]
    pub fn handshake_mismatch(found: impl Into<String>) -> Self {
        Self::HandshakeMismatch {
            found: found.into(),
        }
    }

    /// Creates a token refresh error.
    #[inline]
    pub fn auth_refresh_failed(message: impl Into<String>) -> Self {
        Self::AuthRefreshFailed {
            message: message.into(),
        }
    }

    /// Creates an authorization denied error.
    #[inline]
    pub fn authorize_denied(message: impl Into<String>) -> Self {
        Self::AuthorizeDenied {
            message: message.into(),
        }
    }

    /// Creates a token exchange error.
    #[inline]
    pub fn token_exchange_failed(message: impl Into<String>) -> Self {
        Self::TokenExchangeFailed {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    #[inline]
    pub fn authenticate_failed(message: impl Into<String>) -> Self {
        Self::AuthenticateFailed {
            message: message.into(),
        }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Creates a command failed error.
    #[inline]
    pub fn command_failed(code: i64, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            code,
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Maps a read error, turning an early EOF into [`Error::TruncatedStream`].
    pub(crate) fn from_read(err: IoError, expected: usize) -> Self {
        if err.kind() == ErrorKind::UnexpectedEof {
            Self::truncated_stream(expected)
        } else {
            Self::Io(err)
        }
    }
}

// ============================================================================
// Error Codes
// ============================================================================

impl Error {
    /// Returns the stable short code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ERR 0",
            Self::TransportUnavailable { .. } => "ERR 1",
            Self::HandshakeMismatch { .. } => "ERR 2",
            Self::AuthRefreshFailed { .. } => "ERR 3",
            Self::AuthorizeDenied { .. } => "ERR 4",
            Self::TokenExchangeFailed { .. } => "ERR 5",
            Self::EmptyAccessToken => "ERR 6",
            Self::AuthenticateFailed { .. } => "ERR 7",
            Self::EmptyHandshake => "ERR 8",
            Self::Disconnected | Self::ChannelClosed(_) => "DISCONNECTED",
            Self::ReadTimeout { .. } => "READ_TIMEOUT",
            Self::TruncatedStream { .. } => "TRUNCATED_STREAM",
            Self::MalformedFrame { .. } => "MALFORMED_FRAME",
            Self::CommandFailed { .. } => "COMMAND_FAILED",
            Self::Protocol { .. } => "PROTOCOL",
            Self::OAuth { .. } => "OAUTH",
            Self::Io(_) => "IO",
            Self::Json(_) => "JSON",
            Self::Http(_) => "HTTP",
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout { .. })
    }

    /// Returns `true` if this error happened during the OAuth2 dance.
    #[inline]
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::AuthRefreshFailed { .. }
                | Self::AuthorizeDenied { .. }
                | Self::TokenExchangeFailed { .. }
                | Self::EmptyAccessToken
                | Self::AuthenticateFailed { .. }
                | Self::OAuth { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::TransportUnavailable { .. }
                | Self::TruncatedStream { .. }
                | Self::Disconnected
                | Self::ChannelClosed(_)
                | Self::Io(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

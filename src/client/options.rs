//! Client timeouts and limits.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use discord_ipc::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_connect_timeout(Duration::from_secs(1))
//!     .with_command_timeout(Duration::from_secs(10));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::transport::correlator::DEFAULT_MAX_PENDING;

// ============================================================================
// Constants
// ============================================================================

/// Per-endpoint connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for reading the handshake reply.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a command reply.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the AUTHORIZE reply (the user has to click through a dialog).
pub const DEFAULT_AUTHORIZE_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// ClientOptions
// ============================================================================

/// Timeouts and limits for a [`Client`](crate::Client).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Bound on each endpoint connection attempt.
    pub connect_timeout: Duration,

    /// Bound on the handshake reply.
    pub read_timeout: Duration,

    /// Bound on command replies (blocking calls and AUTHENTICATE).
    pub command_timeout: Duration,

    /// Bound on the AUTHORIZE reply.
    pub authorize_timeout: Duration,

    /// Maximum outstanding commands.
    pub max_pending: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientOptions {
    /// Creates options with default values.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            authorize_timeout: DEFAULT_AUTHORIZE_TIMEOUT,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }

    /// Sets the per-endpoint connect timeout.
    #[inline]
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the handshake read timeout.
    #[inline]
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the command reply timeout.
    #[inline]
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the AUTHORIZE reply timeout.
    #[inline]
    #[must_use]
    pub const fn with_authorize_timeout(mut self, timeout: Duration) -> Self {
        self.authorize_timeout = timeout;
        self
    }

    /// Sets the maximum number of outstanding commands.
    #[inline]
    #[must_use]
    pub const fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.connect_timeout.as_secs(), 3);
        assert_eq!(options.read_timeout.as_secs(), 10);
        assert_eq!(options.command_timeout.as_secs(), 30);
        assert_eq!(options.authorize_timeout.as_secs(), 120);
        assert_eq!(options.max_pending, 1024);
    }

    #[test]
    fn test_builder_methods() {
        let options = ClientOptions::new()
            .with_connect_timeout(Duration::from_millis(100))
            .with_max_pending(8);
        assert_eq!(options.connect_timeout, Duration::from_millis(100));
        assert_eq!(options.max_pending, 8);
        assert_eq!(options.command_timeout, DEFAULT_COMMAND_TIMEOUT);
    }
}

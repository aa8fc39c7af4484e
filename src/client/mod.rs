//! Client lifecycle and command API.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`ClientBuilder`] and validation |
//! | `core` | [`Client`] and its state machine |
//! | `handshake` | Connect sequence |
//! | `options` | Timeouts and limits |
//! | `session` | Per-connection state |

// ============================================================================
// Submodules
// ============================================================================

/// Builder and validation.
pub mod builder;

/// Client and state machine.
pub mod core;

/// Connect sequence.
pub mod handshake;

/// Timeouts and limits.
pub mod options;

/// Per-connection state.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{CLIENT_ID_ENV, CLIENT_SECRET_ENV, ClientBuilder};
pub use core::Client;
pub use handshake::PROTOCOL_VERSION;
pub use options::ClientOptions;
pub use session::{ConnectionState, Session, avatar_url};

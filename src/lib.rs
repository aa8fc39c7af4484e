//! Discord IPC - client for the Discord desktop app's local RPC socket.
//!
//! This library connects to a running Discord client over its local
//! socket, authenticates with OAuth2 and exchanges RPC commands and events.
//!
//! # Architecture
//!
//! - **Local End (Rust)**: Sends commands, receives replies and events
//! - **Remote End (Discord)**: Serves RPC on `discord-ipc-{0..9}`
//!
//! Key design principles:
//!
//! - Each frame is an 8-byte header (opcode, length) plus compact JSON
//! - Replies are matched to commands by nonce
//! - Messages nobody waits for go to a single event handler, in order
//! - One reader owns the socket at a time (blocking during `connect()`,
//!   a background task afterwards)
//!
//! # Quick Start
//!
//! ```no_run
//! use discord_ipc::{Client, CommandType, Result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .client_id("123456789012345678")
//!         .client_secret("secret")
//!         .build()?;
//!
//!     client.connect().await?;
//!     println!("Logged in as {:?}", client.user_id());
//!
//!     let guilds = client
//!         .send_command_blocking(CommandType::GetGuilds, json!({}))
//!         .await?
//!         .into_result()?;
//!     println!("{}", guilds.data);
//!
//!     client.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`auth`] | Stored credential and token endpoint |
//! | [`client`] | [`Client`], builder and options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Nonces and connection ids |
//! | [`protocol`] | Frames, messages and requests |
//! | [`transport`] | Socket, correlation and dispatch |
//! | [`voice`] | Volume conversions |

// ============================================================================
// Modules
// ============================================================================

/// OAuth2 credential storage and token endpoint calls.
pub mod auth;

/// Client lifecycle and command API.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Wire format and message types.
pub mod protocol;

/// Local socket transport.
pub mod transport;

/// Voice volume conversions.
pub mod voice;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Auth types
pub use auth::{
    CredentialStore, FileCredentialStore, HttpTokenExchange, MemoryCredentialStore,
    OAuthCredential, TokenExchange,
};

// Client types
pub use client::{Client, ClientBuilder, ClientOptions, ConnectionState};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, Nonce};

// Protocol types
pub use protocol::{CommandType, EventType, Message, Opcode, Request};

// Transport types
pub use transport::{Connector, EventHandler, Notification, PendingReply, ReplyOutcome};

//! Local socket transport.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Client (Rust)  │                              │  Discord        │
//! │                 │    Unix socket / named pipe  │  desktop app    │
//! │  RawChannel     │◄────────────────────────────►│                 │
//! │  → Connection   │       discord-ipc-{0..9}     │  RPC server     │
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `endpoint::open` - Try `discord-ipc-0..9` until one accepts
//! 2. `RawChannel` - Handshake and authenticate with blocking reads
//! 3. `RawChannel::into_connection` - Start reader and writer tasks
//!    (`into_paused_connection` holds the reader until `Connection::resume`)
//! 4. `Connection` - Send commands, receive replies and events
//! 5. `Connection::shutdown` - Fail pending commands and close
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `endpoint` | Endpoint discovery and connectors |
//! | `correlator` | Nonce to reply matching |
//! | `dispatcher` | Unsolicited message delivery |
//! | `connection` | Socket ownership and read loop |

// ============================================================================
// Submodules
// ============================================================================

/// Socket ownership and read loop.
pub mod connection;

/// Reply correlation.
pub mod correlator;

/// Unsolicited message delivery.
pub mod dispatcher;

/// Endpoint discovery.
pub mod endpoint;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{CloseCallback, Connection, RawChannel};
pub use correlator::{Correlator, PendingReply, ReplyOutcome};
pub use dispatcher::{Dispatcher, EventHandler, Notification};
pub use endpoint::{BoxedStream, Connector, Endpoint, IpcStream, LocalSocketConnector};

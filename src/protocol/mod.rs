//! Discord IPC wire protocol.
//!
//! # Protocol Overview
//!
//! | Item | Direction | Purpose |
//! |------|-----------|---------|
//! | Handshake frame (opcode 0) | Local → Discord | Protocol version and client id |
//! | Command frame (opcode 1) | Local → Discord | `cmd` + `args` + `nonce` |
//! | Reply frame (opcode 1) | Discord → Local | Echoes the command's `nonce` |
//! | Dispatch frame (opcode 1) | Discord → Local | `cmd: DISPATCH` with an `evt` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Header codec and frame reader/writer |
//! | `command` | Command names |
//! | `event` | Event names |
//! | `message` | Decoded, classified frames |
//! | `request` | Outgoing commands |

// ============================================================================
// Submodules
// ============================================================================

/// Command name table.
pub mod command;

/// Event name table.
pub mod event;

/// Header codec and frame I/O.
pub mod frame;

/// Decoded messages.
pub mod message;

/// Outgoing requests.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::CommandType;
pub use event::EventType;
pub use frame::{Frame, FrameReader, FrameWriter, HEADER_SIZE, Header, Opcode};
pub use message::Message;
pub use request::Request;

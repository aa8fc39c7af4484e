//! Local socket endpoints.
//!
//! Discord listens on the first free name out of `discord-ipc-0` through
//! `discord-ipc-9`:
//!
//! | Platform | Location |
//! |----------|----------|
//! | Unix | `$XDG_RUNTIME_DIR`, `$TMPDIR`, `$TMP`, `$TEMP`, else `/tmp` |
//! | Windows | `\\.\pipe\` |
//!
//! Candidates are tried in order with a bounded timeout per attempt, and
//! the first one that accepts wins.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::connection::millis;

// ============================================================================
// Constants
// ============================================================================

/// Fixed prefix of every endpoint name.
pub const ENDPOINT_PREFIX: &str = "discord-ipc-";

/// Number of numbered endpoints tried (suffixes `0..ENDPOINT_COUNT`).
pub const ENDPOINT_COUNT: u8 = 10;

// ============================================================================
// Endpoint
// ============================================================================

/// One candidate socket address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    index: u8,
    path: PathBuf,
}

impl Endpoint {
    /// Creates the endpoint with suffix `index` inside `dir`.
    #[must_use]
    pub fn new(dir: &Path, index: u8) -> Self {
        Self {
            index,
            path: dir.join(format!("{ENDPOINT_PREFIX}{index}")),
        }
    }

    /// Numeric suffix.
    #[inline]
    #[must_use]
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Full socket path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Returns the directory Discord creates its sockets in.
#[cfg(unix)]
#[must_use]
pub fn default_dir() -> PathBuf {
    ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"]
        .iter()
        .filter_map(std::env::var_os)
        .find(|value| !value.is_empty())
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
}

/// Returns the directory Discord creates its pipes in.
#[cfg(windows)]
#[must_use]
pub fn default_dir() -> PathBuf {
    PathBuf::from(r"\\.\pipe")
}

/// Lists every candidate endpoint in `dir`, in the order they are tried.
#[must_use]
pub fn candidates(dir: &Path) -> Vec<Endpoint> {
    (0..ENDPOINT_COUNT)
        .map(|index| Endpoint::new(dir, index))
        .collect()
}

// ============================================================================
// Streams and connectors
// ============================================================================

/// A connected duplex byte stream.
pub trait IpcStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> IpcStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Type-erased connected stream.
pub type BoxedStream = Box<dyn IpcStream>;

/// Opens a stream to one endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `endpoint`.
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<BoxedStream>;
}

/// Connector for the platform's local socket (Unix socket or named pipe).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSocketConnector;

#[async_trait]
impl Connector for LocalSocketConnector {
    #[cfg(unix)]
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<BoxedStream> {
        let stream = tokio::net::UnixStream::connect(endpoint.path()).await?;
        Ok(Box::new(stream))
    }

    #[cfg(windows)]
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<BoxedStream> {
        let pipe = tokio::net::windows::named_pipe::ClientOptions::new().open(endpoint.path())?;
        Ok(Box::new(pipe))
    }
}

/// Connects to the first endpoint that accepts.
///
/// Each attempt is bounded by `per_attempt`.
///
/// # Errors
///
/// Returns [`Error::TransportUnavailable`] if every endpoint fails.
pub async fn open(
    connector: &dyn Connector,
    endpoints: &[Endpoint],
    per_attempt: Duration,
) -> Result<(Endpoint, BoxedStream)> {
    for endpoint in endpoints {
        match timeout(per_attempt, connector.connect(endpoint)).await {
            Ok(Ok(stream)) => {
                debug!(endpoint = %endpoint, "Connected to Discord IPC");
                return Ok((endpoint.clone(), stream));
            }
            Ok(Err(e)) => {
                trace!(endpoint = %endpoint, error = %e, "Endpoint refused connection");
            }
            Err(_) => {
                debug!(
                    endpoint = %endpoint,
                    timeout_ms = millis(per_attempt),
                    "Endpoint connect timed out"
                );
            }
        }
    }

    Err(Error::transport_unavailable(endpoints.len()))
}

// ============================================================================
// Tests
// ============================================================================

//! Connect sequence: endpoint discovery, handshake and authentication.
//!
//! ```text
//! handshake ──► refresh? ──► AUTHENTICATE(stored) ──ok──────────────► done
//!                                  │ rejected / no token
//!                                  ▼
//!                  AUTHORIZE ──► exchange code ──► AUTHENTICATE ──► done
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::OAuthCredential;
use crate::error::{Error, Result};
use crate::protocol::{CommandType, Message, Opcode, Request};
use crate::transport::{Correlator, RawChannel, endpoint};

use super::core::ClientInner;

/// IPC protocol version sent in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

// ============================================================================
// Established
// ============================================================================

/// Authenticated socket, ready to be handed to background tasks.
pub(crate) struct Established {
    pub(crate) channel: RawChannel,
    pub(crate) user_id: String,
    pub(crate) cdn_host: String,
}

// ============================================================================
// Sequence
// ============================================================================

impl ClientInner {
    /// Runs the whole connect sequence on a fresh socket.
    pub(crate) async fn establish(&self) -> Result<Established> {
        let endpoints = endpoint::candidates(&self.endpoint_dir);
        let (endpoint, stream) =
            endpoint::open(self.connector.as_ref(), &endpoints, self.options.connect_timeout)
                .await?;

        let correlator = Arc::new(Correlator::new(
            self.dispatcher.clone(),
            self.options.max_pending,
        ));
        let mut channel = RawChannel::new(stream, correlator);

        let cdn_host = self.handshake(&mut channel).await?;
        let user_id = self.authenticate(&mut channel).await?;

        info!(endpoint = %endpoint, user_id = %user_id, "Authenticated");
        Ok(Established {
            channel,
            user_id,
            cdn_host,
        })
    }

    /// Sends the handshake and returns the announced CDN host.
    async fn handshake(&self, channel: &mut RawChannel) -> Result<String> {
        let payload = json!({ "v": PROTOCOL_VERSION, "client_id": self.client_id });
        channel.send_frame(Opcode::Handshake, &payload).await?;

        let ready = channel.read_message(self.options.read_timeout).await?;
        if ready.is_empty() {
            return Err(Error::EmptyHandshake);
        }
        if ready.command != Some(CommandType::Dispatch) {
            return Err(Error::handshake_mismatch(
                ready.command_name().unwrap_or("<none>"),
            ));
        }

        let cdn_host = ready
            .data_str(&["config", "cdn_host"])
            .unwrap_or_default()
            .to_string();
        debug!(cdn_host = %cdn_host, "Handshake accepted");
        Ok(cdn_host)
    }

    /// Authenticates with a stored or freshly authorized token.
    async fn authenticate(&self, channel: &mut RawChannel) -> Result<String> {
        let mut credential = self.load_credential();

        if let Some(refresh_token) = credential.refresh_token().map(str::to_owned) {
            match self.token_exchange.refresh(&refresh_token).await {
                Ok(fresh) => {
                    debug!("Stored token refreshed");
                    credential = fresh;
                    self.save_credential(&credential);
                }
                Err(e) => {
                    let soft = Error::auth_refresh_failed(e.to_string());
                    warn!(code = soft.code(), error = %e, "Token refresh failed");
                    self.record_soft_error(soft.code());
                }
            }
        }

        if let Some(access_token) = credential.access_token() {
            let reply = channel
                .request(authenticate_request(access_token), self.options.command_timeout)
                .await?;
            if accepted(&reply, CommandType::Authenticate)
                && let Some(user_id) = reply.data_str(&["user", "id"])
            {
                return Ok(user_id.to_string());
            }
            debug!(reason = %describe(&reply), "Stored token rejected, authorizing");
        }

        self.authorize(channel).await
    }

    /// AUTHORIZE, code exchange, then AUTHENTICATE with the new token.
    async fn authorize(&self, channel: &mut RawChannel) -> Result<String> {
        info!("Requesting authorization from Discord");
        let request = Request::new(
            CommandType::Authorize,
            json!({ "client_id": self.client_id, "scopes": self.scopes }),
        );
        let reply = channel
            .request(request, self.options.authorize_timeout)
            .await?;
        if !accepted(&reply, CommandType::Authorize) {
            return Err(Error::authorize_denied(describe(&reply)));
        }
        let code = reply.data_str(&["code"]).unwrap_or_default();

        let credential = self
            .token_exchange
            .exchange_code(code)
            .await
            .map_err(|e| Error::token_exchange_failed(e.to_string()))?;
        let access_token = credential
            .access_token()
            .ok_or(Error::EmptyAccessToken)?
            .to_string();
        self.save_credential(&credential);

        let reply = channel
            .request(authenticate_request(&access_token), self.options.command_timeout)
            .await?;
        if !accepted(&reply, CommandType::Authenticate) {
            return Err(Error::authenticate_failed(describe(&reply)));
        }

        Ok(reply
            .data_str(&["user", "id"])
            .unwrap_or_default()
            .to_string())
    }

    fn load_credential(&self) -> OAuthCredential {
        self.credentials.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load credential");
            OAuthCredential::default()
        })
    }

    fn save_credential(&self, credential: &OAuthCredential) {
        if let Err(e) = self.credentials.save(credential) {
            warn!(error = %e, "Failed to save credential");
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn authenticate_request(access_token: &str) -> Request {
    Request::new(
        CommandType::Authenticate,
        json!({ "access_token": access_token }),
    )
}

/// Returns `true` if `reply` answers `command` without an ERROR event.
fn accepted(reply: &Message, command: CommandType) -> bool {
    reply.command == Some(command) && !reply.is_error()
}

fn describe(reply: &Message) -> String {
    reply
        .error_message()
        .or_else(|| reply.command_name())
        .unwrap_or("empty reply")
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

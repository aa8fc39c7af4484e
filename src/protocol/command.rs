//! Command names.
//!
//! The client only frames and correlates commands; it never interprets their
//! arguments. [`CommandType`] exists so callers do not have to spell wire
//! names by hand, and so replies can be classified by their `cmd` field.
//!
//! | Group | Commands |
//! |-------|----------|
//! | Session | `DISPATCH`, `AUTHORIZE`, `AUTHENTICATE` |
//! | Guilds / channels | `GET_GUILD`, `GET_GUILDS`, `GET_CHANNEL`, `GET_CHANNELS`, `SELECT_TEXT_CHANNEL` |
//! | Events | `SUBSCRIBE`, `UNSUBSCRIBE` |
//! | Voice | `GET_VOICE_SETTINGS`, `SET_VOICE_SETTINGS`, `SET_USER_VOICE_SETTINGS`, `SELECT_VOICE_CHANNEL`, `GET_SELECTED_VOICE_CHANNEL`, `SET_CERTIFIED_DEVICES` |
//! | Activity | `SET_ACTIVITY`, `SEND_ACTIVITY_JOIN_INVITE`, `CLOSE_ACTIVITY_REQUEST` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::LazyLock;

use rustc_hash::FxHashMap;

// ============================================================================
// CommandType
// ============================================================================

/// Known RPC commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    /// Server-initiated dispatch (READY and subscribed events).
    Dispatch,
    /// Ask the user to authorize the application.
    Authorize,
    /// Authenticate with an OAuth2 access token.
    Authenticate,
    /// Fetch one guild.
    GetGuild,
    /// Fetch the user's guilds.
    GetGuilds,
    /// Fetch one channel.
    GetChannel,
    /// Fetch a guild's channels.
    GetChannels,
    /// Subscribe to an event.
    Subscribe,
    /// Unsubscribe from an event.
    Unsubscribe,
    /// Change another user's local voice settings.
    SetUserVoiceSettings,
    /// Join or leave a voice channel.
    SelectVoiceChannel,
    /// Fetch the current voice channel.
    GetSelectedVoiceChannel,
    /// Join or leave a text channel.
    SelectTextChannel,
    /// Fetch local voice settings.
    GetVoiceSettings,
    /// Change local voice settings.
    SetVoiceSettings,
    /// Report certified audio devices.
    SetCertifiedDevices,
    /// Set rich presence.
    SetActivity,
    /// Accept an activity join request.
    SendActivityJoinInvite,
    /// Reject an activity join request.
    CloseActivityRequest,
}

/// Wire name of every command.
const COMMAND_NAMES: &[(&str, CommandType)] = &[
    ("DISPATCH", CommandType::Dispatch),
    ("AUTHORIZE", CommandType::Authorize),
    ("AUTHENTICATE", CommandType::Authenticate),
    ("GET_GUILD", CommandType::GetGuild),
    ("GET_GUILDS", CommandType::GetGuilds),
    ("GET_CHANNEL", CommandType::GetChannel),
    ("GET_CHANNELS", CommandType::GetChannels),
    ("SUBSCRIBE", CommandType::Subscribe),
    ("UNSUBSCRIBE", CommandType::Unsubscribe),
    ("SET_USER_VOICE_SETTINGS", CommandType::SetUserVoiceSettings),
    ("SELECT_VOICE_CHANNEL", CommandType::SelectVoiceChannel),
    ("GET_SELECTED_VOICE_CHANNEL", CommandType::GetSelectedVoiceChannel),
    ("SELECT_TEXT_CHANNEL", CommandType::SelectTextChannel),
    ("GET_VOICE_SETTINGS", CommandType::GetVoiceSettings),
    ("SET_VOICE_SETTINGS", CommandType::SetVoiceSettings),
    ("SET_CERTIFIED_DEVICES", CommandType::SetCertifiedDevices),
    ("SET_ACTIVITY", CommandType::SetActivity),
    ("SEND_ACTIVITY_JOIN_INVITE", CommandType::SendActivityJoinInvite),
    ("CLOSE_ACTIVITY_REQUEST", CommandType::CloseActivityRequest),
];

static COMMANDS_BY_NAME: LazyLock<FxHashMap<&'static str, CommandType>> =
    LazyLock::new(|| COMMAND_NAMES.iter().copied().collect());

impl CommandType {
    /// Classifies a `cmd` string.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        COMMANDS_BY_NAME.get(name).copied()
    }

    /// Returns the wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        COMMAND_NAMES
            .iter()
            .find(|(_, command)| *command == self)
            .map_or("", |(name, _)| *name)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

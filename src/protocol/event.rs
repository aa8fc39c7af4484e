//! Event classification.
//!
//! Discord tags pushed messages (and error replies) with an `evt` string such
//! as `VOICE_STATE_UPDATE`. [`EventType::from_name`] maps those strings onto
//! a closed enum through a table built once and shared read-only; anything
//! not in the table classifies as [`EventType::Unknown`].
//!
//! | Group | Events |
//! |-------|--------|
//! | Lifecycle | `READY`, `ERROR` |
//! | Guild / channel | `GUILD_STATUS`, `GUILD_CREATE`, `CHANNEL_CREATE` |
//! | Voice | `VOICE_CHANNEL_SELECT`, `VOICE_STATE_*`, `VOICE_SETTINGS_UPDATE`, `VOICE_CONNECTION_STATUS`, `SPEAKING_*` |
//! | Messages | `MESSAGE_*`, `NOTIFICATION_CREATE` |
//! | Activity | `ACTIVITY_JOIN`, `ACTIVITY_SPECTATE`, `ACTIVITY_JOIN_REQUEST` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::LazyLock;

use rustc_hash::FxHashMap;

// ============================================================================
// EventType
// ============================================================================

/// Classified `evt` field of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventType {
    /// No `evt` field, or a name outside the table.
    #[default]
    Unknown,
    /// Handshake accepted.
    Ready,
    /// The reply is an error.
    Error,
    /// Guild status changed.
    GuildStatus,
    /// Joined a guild.
    GuildCreate,
    /// Channel created.
    ChannelCreate,
    /// User joined or left a voice channel.
    VoiceChannelSelect,
    /// A user joined the subscribed voice channel.
    VoiceStateCreate,
    /// A user's voice state changed.
    VoiceStateUpdate,
    /// A user left the subscribed voice channel.
    VoiceStateDelete,
    /// Local voice settings changed.
    VoiceSettingsUpdate,
    /// Voice connection status changed.
    VoiceConnectionStatus,
    /// A user started speaking.
    SpeakingStart,
    /// A user stopped speaking.
    SpeakingStop,
    /// Message posted.
    MessageCreate,
    /// Message edited.
    MessageUpdate,
    /// Message deleted.
    MessageDelete,
    /// Desktop notification raised.
    NotificationCreate,
    /// User accepted a join invite.
    ActivityJoin,
    /// User accepted a spectate invite.
    ActivitySpectate,
    /// Someone asked to join.
    ActivityJoinRequest,
}

/// Wire name of every classified event.
const EVENT_NAMES: &[(&str, EventType)] = &[
    ("READY", EventType::Ready),
    ("ERROR", EventType::Error),
    ("GUILD_STATUS", EventType::GuildStatus),
    ("GUILD_CREATE", EventType::GuildCreate),
    ("CHANNEL_CREATE", EventType::ChannelCreate),
    ("VOICE_CHANNEL_SELECT", EventType::VoiceChannelSelect),
    ("VOICE_STATE_CREATE", EventType::VoiceStateCreate),
    ("VOICE_STATE_UPDATE", EventType::VoiceStateUpdate),
    ("VOICE_STATE_DELETE", EventType::VoiceStateDelete),
    ("VOICE_SETTINGS_UPDATE", EventType::VoiceSettingsUpdate),
    ("VOICE_CONNECTION_STATUS", EventType::VoiceConnectionStatus),
    ("SPEAKING_START", EventType::SpeakingStart),
    ("SPEAKING_STOP", EventType::SpeakingStop),
    ("MESSAGE_CREATE", EventType::MessageCreate),
    ("MESSAGE_UPDATE", EventType::MessageUpdate),
    ("MESSAGE_DELETE", EventType::MessageDelete),
    ("NOTIFICATION_CREATE", EventType::NotificationCreate),
    ("ACTIVITY_JOIN", EventType::ActivityJoin),
    ("ACTIVITY_SPECTATE", EventType::ActivitySpectate),
    ("ACTIVITY_JOIN_REQUEST", EventType::ActivityJoinRequest),
];

static EVENTS_BY_NAME: LazyLock<FxHashMap<&'static str, EventType>> =
    LazyLock::new(|| EVENT_NAMES.iter().copied().collect());

impl EventType {
    /// Classifies an `evt` string.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        EVENTS_BY_NAME.get(name).copied().unwrap_or_default()
    }

    /// Returns the wire name, or `"UNKNOWN"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        EVENT_NAMES
            .iter()
            .find(|(_, event)| *event == self)
            .map_or("UNKNOWN", |(name, _)| *name)
    }

    /// Returns `true` for voice-related events.
    #[inline]
    #[must_use]
    pub fn is_voice(self) -> bool {
        matches!(
            self,
            Self::VoiceChannelSelect
                | Self::VoiceStateCreate
                | Self::VoiceStateUpdate
                | Self::VoiceStateDelete
                | Self::VoiceSettingsUpdate
                | Self::VoiceConnectionStatus
                | Self::SpeakingStart
                | Self::SpeakingStop
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_known() {
        assert_eq!(EventType::from_name("READY"), EventType::Ready);
        assert_eq!(
            EventType::from_name("VOICE_STATE_UPDATE"),
            EventType::VoiceStateUpdate
        );
        assert_eq!(
            EventType::from_name("ACTIVITY_JOIN_REQUEST"),
            EventType::ActivityJoinRequest
        );
    }

    #[test]
    fn test_from_name_unknown() {
        assert_eq!(EventType::from_name("LOBBY_UPDATE"), EventType::Unknown);
        assert_eq!(EventType::from_name(""), EventType::Unknown);
        assert_eq!(EventType::from_name("ready"), EventType::Unknown);
    }

    #[test]
    fn test_names_roundtrip() {
        for (name, event) in EVENT_NAMES {
            assert_eq!(EventType::from_name(name), *event);
            assert_eq!(event.as_str(), *name);
        }
        assert_eq!(EventType::Unknown.as_str(), "UNKNOWN");
    }

    #[test]
    fn test_is_voice() {
        assert!(EventType::SpeakingStart.is_voice());
        assert!(!EventType::GuildStatus.is_voice());
    }
}

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// How an inbound message reached the bot, as far as the reply policy cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    DirectMessage,
    Mention,
    PlainChannelMessage,
}

/// Which message kinds warrant an auto-reply, and whether office hours apply to them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespondPolicy {
    /// Every message kind replies only outside office hours.
    AlwaysOnOffHours,
    /// DMs and mentions always reply; channel chatter only outside office hours.
    #[default]
    DmAndMentionAlways,
    /// Only DMs reply, and only outside office hours.
    DmOnly,
}

impl RespondPolicy {
    pub fn permits(&self, kind: MessageKind, out_of_office: bool) -> bool {
        match (self, kind) {
            (Self::AlwaysOnOffHours, _) => out_of_office,
            (Self::DmAndMentionAlways, MessageKind::DirectMessage | MessageKind::Mention) => true,
            (Self::DmAndMentionAlways, MessageKind::PlainChannelMessage) => out_of_office,
            (Self::DmOnly, MessageKind::DirectMessage) => out_of_office,
            (Self::DmOnly, _) => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlwaysOnOffHours => "always_on_off_hours",
            Self::DmAndMentionAlways => "dm_and_mention_always",
            Self::DmOnly => "dm_only",
        }
    }
}

impl std::str::FromStr for RespondPolicy {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always_on_off_hours" => Ok(Self::AlwaysOnOffHours),
            "dm_and_mention_always" => Ok(Self::DmAndMentionAlways),
            "dm_only" => Ok(Self::DmOnly),
            other => Err(DomainError::UnsupportedVariant {
                kind: "respond policy",
                value: other.to_owned(),
                expected: "always_on_off_hours|dm_and_mention_always|dm_only",
            }),
        }
    }
}

/// Which event field scopes the cooldown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKeySource {
    #[default]
    Channel,
    User,
}

impl ConversationKeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::User => "user",
        }
    }
}

impl std::str::FromStr for ConversationKeySource {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "channel" => Ok(Self::Channel),
            "user" => Ok(Self::User),
            other => Err(DomainError::UnsupportedVariant {
                kind: "conversation key",
                value: other.to_owned(),
                expected: "channel|user",
            }),
        }
    }
}

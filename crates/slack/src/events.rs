use afterhours_core::MessageKind;
use serde_json::Value;

/// Slack Events API envelope, read permissively: any field with an unexpected shape is treated
/// as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventEnvelope {
    pub envelope_type: Option<String>,
    pub challenge: Option<Value>,
    pub event_id: Option<String>,
    pub team_id: Option<String>,
    pub event: Option<MessagePayload>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessagePayload {
    pub event_type: Option<String>,
    pub subtype: Option<String>,
    pub channel: Option<String>,
    pub channel_type: Option<String>,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    pub text: Option<String>,
    pub ts: Option<String>,
}

impl EventEnvelope {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value = serde_json::from_slice::<Value>(body)?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Self {
        Self {
            envelope_type: string_field(value, "type"),
            challenge: value.get("challenge").cloned(),
            event_id: string_field(value, "event_id"),
            team_id: string_field(value, "team_id"),
            event: value
                .get("event")
                .filter(|event| event.is_object())
                .map(MessagePayload::from_value),
        }
    }
}

impl MessagePayload {
    pub fn from_value(value: &Value) -> Self {
        Self {
            event_type: string_field(value, "type"),
            subtype: string_field(value, "subtype"),
            channel: string_field(value, "channel"),
            channel_type: string_field(value, "channel_type"),
            user: string_field(value, "user"),
            bot_id: string_field(value, "bot_id"),
            text: string_field(value, "text"),
            ts: string_field(value, "ts"),
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

impl EventContext {
    pub fn from_envelope(envelope: &EventEnvelope) -> Self {
        let correlation_id = envelope
            .event_id
            .clone()
            .or_else(|| envelope.event.as_ref().and_then(|event| event.ts.clone()));
        match correlation_id {
            Some(correlation_id) => Self { correlation_id },
            None => Self::default(),
        }
    }
}

/// The bot's own identity plus platform accounts whose messages never get a reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: Option<String>,
    pub system_user_ids: Vec<String>,
}

impl BotIdentity {
    pub fn new(user_id: Option<String>, system_user_ids: Vec<String>) -> Self {
        Self { user_id, system_user_ids }
    }

    pub fn is_self(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }

    pub fn is_system_account(&self, user_id: &str) -> bool {
        self.system_user_ids.iter().any(|system| system == user_id)
    }

    pub fn is_mentioned_in(&self, text: &str) -> bool {
        let Some(user_id) = self.user_id.as_deref() else {
            return false;
        };
        // Slack renders mentions as `<@U123>` or, with a label, `<@U123|name>`.
        text.contains(&format!("<@{user_id}>")) || text.contains(&format!("<@{user_id}|"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    MissingEvent,
    UnsupportedType(String),
    Subtype(String),
    OwnMessage,
    BotMessage,
    SystemAccount,
    MissingAuthor,
    MissingChannel,
}

impl IgnoreReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingEvent => "missing_event",
            Self::UnsupportedType(_) => "unsupported_type",
            Self::Subtype(_) => "subtype",
            Self::OwnMessage => "own_message",
            Self::BotMessage => "bot_message",
            Self::SystemAccount => "system_account",
            Self::MissingAuthor => "missing_author",
            Self::MissingChannel => "missing_channel",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    VerificationChallenge(Value),
    DirectMessage(MessageEvent),
    Mention(MessageEvent),
    PlainChannelMessage(MessageEvent),
    Ignored(IgnoreReason),
}

impl InboundEvent {
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Self::DirectMessage(_) => Some(MessageKind::DirectMessage),
            Self::Mention(_) => Some(MessageKind::Mention),
            Self::PlainChannelMessage(_) => Some(MessageKind::PlainChannelMessage),
            Self::VerificationChallenge(_) | Self::Ignored(_) => None,
        }
    }

    pub fn message(&self) -> Option<&MessageEvent> {
        match self {
            Self::DirectMessage(message)
            | Self::Mention(message)
            | Self::PlainChannelMessage(message) => Some(message),
            Self::VerificationChallenge(_) | Self::Ignored(_) => None,
        }
    }
}

pub fn classify(envelope: &EventEnvelope, identity: &BotIdentity) -> InboundEvent {
    if let Some(challenge) = &envelope.challenge {
        return InboundEvent::VerificationChallenge(challenge.clone());
    }

    let Some(event) = &envelope.event else {
        return InboundEvent::Ignored(IgnoreReason::MissingEvent);
    };

    let event_type = event.event_type.as_deref().unwrap_or_default();
    let is_app_mention = match event_type {
        "message" => false,
        "app_mention" => true,
        other => return InboundEvent::Ignored(IgnoreReason::UnsupportedType(other.to_owned())),
    };

    if let Some(subtype) = &event.subtype {
        return InboundEvent::Ignored(IgnoreReason::Subtype(subtype.clone()));
    }

    let Some(user_id) = event.user.as_deref().filter(|user| !user.is_empty()) else {
        let reason = if event.bot_id.is_some() {
            IgnoreReason::BotMessage
        } else {
            IgnoreReason::MissingAuthor
        };
        return InboundEvent::Ignored(reason);
    };
    if identity.is_self(user_id) {
        return InboundEvent::Ignored(IgnoreReason::OwnMessage);
    }
    if identity.is_system_account(user_id) {
        return InboundEvent::Ignored(IgnoreReason::SystemAccount);
    }
    if event.bot_id.is_some() {
        return InboundEvent::Ignored(IgnoreReason::BotMessage);
    }

    let Some(channel_id) = event.channel.as_deref().filter(|channel| !channel.is_empty()) else {
        return InboundEvent::Ignored(IgnoreReason::MissingChannel);
    };

    let text = event.text.clone().unwrap_or_default();
    let message = MessageEvent {
        channel_id: channel_id.to_owned(),
        user_id: user_id.to_owned(),
        text,
        ts: event.ts.clone(),
    };

    if event.channel_type.as_deref() == Some("im") {
        InboundEvent::DirectMessage(message)
    } else if is_app_mention || identity.is_mentioned_in(&message.text) {
        InboundEvent::Mention(message)
    } else {
        InboundEvent::PlainChannelMessage(message)
    }
}

use std::sync::Arc;

use afterhours_core::{
    config::{AppConfig, ConfigError},
    Clock, ConversationKeySource, CooldownGate, MessageKind, OfficeHours, RespondPolicy,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    client::{MessageSender, SendError},
    events::{classify, BotIdentity, EventContext, EventEnvelope, IgnoreReason, InboundEvent},
    reply::ReplyTemplate,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponderSettings {
    pub policy: RespondPolicy,
    pub conversation_key: ConversationKeySource,
    pub office_hours: OfficeHours,
    pub cooldown_secs: u64,
    pub reply: ReplyTemplate,
}

impl ResponderSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            policy: config.responder.policy,
            conversation_key: config.responder.conversation_key,
            office_hours: config.office_hours.window()?,
            cooldown_secs: config.responder.cooldown_secs,
            reply: ReplyTemplate::from_config(&config.responder),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandleOutcome {
    Challenge,
    Ignored(IgnoreReason),
    NotEligible { kind: MessageKind, out_of_office: bool },
    CoolingDown { key: String },
    Dispatched { key: String },
    DispatchFailed { key: String, error: SendError },
}

impl HandleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Challenge => "challenge",
            Self::Ignored(_) => "ignored",
            Self::NotEligible { .. } => "not_eligible",
            Self::CoolingDown { .. } => "cooling_down",
            Self::Dispatched { .. } => "dispatched",
            Self::DispatchFailed { .. } => "dispatch_failed",
        }
    }
}

/// Decides whether an inbound event earns an out-of-office reply and sends it.
///
/// Nothing here fails outward: every path ends in a [`HandleOutcome`] so the webhook can always
/// acknowledge. The cooldown is recorded before the send and is kept when the send fails, so a
/// conversation gets at most one attempt per window.
pub struct AutoResponder {
    settings: ResponderSettings,
    identity: BotIdentity,
    gate: Arc<CooldownGate>,
    sender: Arc<dyn MessageSender>,
    clock: Arc<dyn Clock>,
}

impl AutoResponder {
    pub fn new(
        settings: ResponderSettings,
        identity: BotIdentity,
        sender: Arc<dyn MessageSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let gate = Arc::new(CooldownGate::from_secs(settings.cooldown_secs));
        Self { settings, identity, gate, sender, clock }
    }

    pub fn settings(&self) -> &ResponderSettings {
        &self.settings
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    pub fn gate(&self) -> Arc<CooldownGate> {
        Arc::clone(&self.gate)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn is_out_of_office(&self) -> bool {
        self.settings.office_hours.is_out_of_office(self.clock.now())
    }

    pub async fn handle(&self, envelope: &EventEnvelope) -> HandleOutcome {
        let now = self.clock.now();
        self.handle_at(envelope, now).await
    }

    pub async fn handle_at(&self, envelope: &EventEnvelope, now: DateTime<Utc>) -> HandleOutcome {
        let ctx = EventContext::from_envelope(envelope);
        let event = classify(envelope, &self.identity);

        let (kind, message) = match (&event, event.kind(), event.message()) {
            (InboundEvent::VerificationChallenge(_), _, _) => return HandleOutcome::Challenge,
            (InboundEvent::Ignored(reason), _, _) => {
                debug!(
                    event_name = "responder.event.ignored",
                    correlation_id = %ctx.correlation_id,
                    reason = reason.label(),
                    "inbound event ignored"
                );
                return HandleOutcome::Ignored(reason.clone());
            }
            (_, Some(kind), Some(message)) => (kind, message),
            // classified messages always carry a kind and a message
            _ => return HandleOutcome::Ignored(IgnoreReason::MissingEvent),
        };

        let out_of_office = self.settings.office_hours.is_out_of_office(now);
        if !self.settings.policy.permits(kind, out_of_office) {
            debug!(
                event_name = "responder.event.not_eligible",
                correlation_id = %ctx.correlation_id,
                kind = ?kind,
                out_of_office,
                policy = self.settings.policy.as_str(),
                "respond policy declined event"
            );
            return HandleOutcome::NotEligible { kind, out_of_office };
        }

        let key = match self.settings.conversation_key {
            ConversationKeySource::Channel => message.channel_id.clone(),
            ConversationKeySource::User => message.user_id.clone(),
        };

        if !self.gate.try_acquire(&key, now) {
            debug!(
                event_name = "responder.event.cooling_down",
                correlation_id = %ctx.correlation_id,
                conversation_key = %key,
                "conversation notified recently; skipping reply"
            );
            return HandleOutcome::CoolingDown { key };
        }

        let text = self.settings.reply.render(&message.user_id);
        match self.sender.send(&message.channel_id, &text).await {
            Ok(()) => {
                info!(
                    event_name = "responder.dispatch.sent",
                    correlation_id = %ctx.correlation_id,
                    conversation_key = %key,
                    channel_id = %message.channel_id,
                    kind = ?kind,
                    "out-of-office reply sent"
                );
                HandleOutcome::Dispatched { key }
            }
            Err(error) => {
                warn!(
                    event_name = "responder.dispatch.failed",
                    correlation_id = %ctx.correlation_id,
                    conversation_key = %key,
                    channel_id = %message.channel_id,
                    error = %error,
                    "out-of-office reply failed; cooldown stays recorded"
                );
                HandleOutcome::DispatchFailed { key, error }
            }
        }
    }
}

//! Slack integration - Events API auto-responder
//!
//! This crate turns Slack Events API payloads into out-of-office replies:
//! - **Events** (`events`) - permissive envelope parsing and message classification
//! - **Client** (`client`) - `chat.postMessage` / `auth.test` over the Web API
//! - **Reply** (`reply`) - canned reply text with author and recipient placeholders
//! - **Responder** (`responder`) - policy, office-hours and cooldown gating, then dispatch
//!
//! # Architecture
//!
//! ```text
//! POST /slack/events → EventEnvelope → classify → AutoResponder
//!                                                   ↓ policy + office hours
//!                                                   ↓ CooldownGate::try_acquire
//!                                            MessageSender::send
//! ```
//!
//! # Key Types
//!
//! - `AutoResponder` - decision and dispatch orchestrator
//! - `InboundEvent` - classified event (challenge, DM, mention, channel message, ignored)
//! - `MessageSender` - trait for the outbound send, implemented by `SlackWebClient`

pub mod client;
pub mod events;
pub mod reply;
pub mod responder;

pub use client::{MessageSender, SendError, SlackWebClient};
pub use events::{classify, BotIdentity, EventEnvelope, InboundEvent};
pub use responder::{AutoResponder, HandleOutcome, ResponderSettings};

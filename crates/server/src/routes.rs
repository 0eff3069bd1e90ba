use std::sync::Arc;

use afterhours_slack::{AutoResponder, EventEnvelope};
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub responder: Arc<AutoResponder>,
}

pub fn router(responder: Arc<AutoResponder>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health::health))
        .route("/slack/events", post(slack_events))
        .with_state(AppState { responder })
}

pub async fn liveness() -> &'static str {
    "afterhours auto-responder is running"
}

/// Always answers 200 so Slack never retries or disables the subscription.
pub async fn slack_events(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let envelope = match EventEnvelope::parse(&body) {
        Ok(envelope) => envelope,
        Err(error) => {
            warn!(
                event_name = "ingress.slack.payload_rejected",
                correlation_id = "unknown",
                error = %error,
                body_len = body.len(),
                "inbound payload is not valid JSON; acknowledging anyway"
            );
            return acknowledged();
        }
    };

    if let Some(challenge) = envelope.challenge {
        info!(
            event_name = "ingress.slack.url_verification",
            correlation_id = "url_verification",
            "answering slack verification challenge"
        );
        return Json(json!({ "challenge": challenge }));
    }

    debug!(
        event_name = "ingress.slack.event_received",
        correlation_id = envelope.event_id.as_deref().unwrap_or("unknown"),
        envelope_type = envelope.envelope_type.as_deref().unwrap_or("unknown"),
        team_id = envelope.team_id.as_deref().unwrap_or("unknown"),
        "received slack event"
    );

    let outcome = state.responder.handle(&envelope).await;
    debug!(
        event_name = "ingress.slack.event_handled",
        correlation_id = envelope.event_id.as_deref().unwrap_or("unknown"),
        outcome = outcome.label(),
        "slack event handled"
    );

    acknowledged()
}

fn acknowledged() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use afterhours_core::{ConversationKeySource, ManualClock, OfficeHours, RespondPolicy};
    use afterhours_slack::{
        reply::ReplyTemplate, AutoResponder, BotIdentity, MessageSender, ResponderSettings,
        SendError,
    };
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use super::router;

    #[derive(Default)]
    pub(crate) struct ScriptedSender {
        results: Mutex<VecDeque<Result<(), SendError>>>,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedSender {
        pub(crate) async fn fail_next(&self, error: SendError) {
            self.results.lock().await.push_back(Err(error));
        }

        pub(crate) async fn sent_count(&self) -> usize {
            self.sent.lock().await.len()
        }
    }

    #[async_trait]
    impl MessageSender for ScriptedSender {
        async fn send(&self, channel_id: &str, text: &str) -> Result<(), SendError> {
            self.sent.lock().await.push((channel_id.to_owned(), text.to_owned()));
            self.results.lock().await.pop_front().unwrap_or(Ok(()))
        }
    }

    /// Router over a responder whose clock sits at 22:00 UTC, outside a 14..9 UTC window.
    pub(crate) fn test_app() -> (Router, Arc<AutoResponder>, Arc<ScriptedSender>) {
        let sender = Arc::new(ScriptedSender::default());
        let night = Utc.with_ymd_and_hms(2026, 5, 4, 22, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(night));
        let settings = ResponderSettings {
            policy: RespondPolicy::DmAndMentionAlways,
            conversation_key: ConversationKeySource::Channel,
            office_hours: OfficeHours::new(14, 9, Tz::UTC).expect("valid window"),
            cooldown_secs: 600,
            reply: ReplyTemplate::new("Hi {author}, I'm away.", None),
        };
        let identity = BotIdentity::new(Some("UBOT".to_owned()), vec!["USLACKBOT".to_owned()]);
        let responder = Arc::new(AutoResponder::new(settings, identity, sender.clone(), clock));

        (router(responder.clone()), responder, sender)
    }

    async fn post_events(app: Router, body: &'static str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/slack/events")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    const DM_EVENT: &str = r#"{
        "type": "event_callback",
        "event_id": "Ev100",
        "event": {"type": "message", "channel": "D1", "channel_type": "im", "user": "U1", "text": "hi"}
    }"#;

    #[tokio::test]
    async fn challenge_is_echoed_without_side_effects() {
        let (app, responder, sender) = test_app();

        let (status, body) = post_events(app, r#"{"challenge":"abc123"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "challenge": "abc123" }));
        assert_eq!(sender.sent_count().await, 0);
        assert_eq!(responder.gate().tracked_keys(), 0);
    }

    #[tokio::test]
    async fn direct_message_is_acknowledged_and_dispatched() {
        let (app, responder, sender) = test_app();

        let (status, body) = post_events(app, DM_EVENT).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "OK" }));
        assert_eq!(sender.sent_count().await, 1);
        assert!(responder.gate().last_notified("D1").is_some());
    }

    #[tokio::test]
    async fn send_failure_still_acknowledges() {
        let (app, responder, sender) = test_app();
        sender.fail_next(SendError::Timeout).await;

        let (status, body) = post_events(app, DM_EVENT).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "OK" }));
        assert!(responder.gate().last_notified("D1").is_some());
    }

    #[tokio::test]
    async fn malformed_body_is_acknowledged() {
        let (app, _responder, sender) = test_app();

        let (status, body) = post_events(app, "payload=not-json").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "OK" }));
        assert_eq!(sender.sent_count().await, 0);
    }

    #[tokio::test]
    async fn liveness_returns_static_text() {
        let (app, _responder, _sender) = test_app();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&bytes[..], b"afterhours auto-responder is running");
    }
}

use std::time::Duration;

use afterhours_core::config::SlackConfig;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("slack api rejected the request: {0}")]
    Api(String),
    #[error("slack returned HTTP {status}")]
    Http { status: u16 },
    #[error("slack request timed out")]
    Timeout,
    #[error("slack transport failed: {0}")]
    Transport(String),
    #[error("slack response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Outbound half of the responder: deliver `text` into `channel_id`.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), SendError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthIdentity {
    pub user_id: String,
    pub bot_id: Option<String>,
    pub team: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    error: Option<String>,
    user_id: Option<String>,
    bot_id: Option<String>,
    team: Option<String>,
}

/// Minimal Slack Web API client: `chat.postMessage` and `auth.test`.
pub struct SlackWebClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

impl std::fmt::Debug for SlackWebClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackWebClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl SlackWebClient {
    pub fn new(
        base_url: impl Into<String>,
        bot_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| SendError::Transport(error.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();

        Ok(Self { http, base_url, bot_token })
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self, SendError> {
        Self::new(
            config.api_base_url.clone(),
            config.bot_token.clone(),
            Duration::from_secs(config.send_timeout_secs),
        )
    }

    pub async fn auth_test(&self) -> Result<AuthIdentity, SendError> {
        let response = self.call("auth.test", &json!({})).await?;
        let user_id = response
            .user_id
            .ok_or_else(|| SendError::Decode("auth.test response is missing user_id".to_owned()))?;

        Ok(AuthIdentity { user_id, bot_id: response.bot_id, team: response.team })
    }

    async fn call(&self, method: &str, body: &Value) -> Result<ApiResponse, SendError> {
        let url = format!("{}/{method}", self.base_url);
        debug!(method, "calling slack web api");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Http { status: status.as_u16() });
        }

        // Slack reports most failures as HTTP 200 with `ok: false`.
        let payload = response.json::<ApiResponse>().await?;
        if !payload.ok {
            return Err(SendError::Api(payload.error.unwrap_or_else(|| "unknown".to_owned())));
        }

        Ok(payload)
    }
}

#[async_trait]
impl MessageSender for SlackWebClient {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), SendError> {
        self.call("chat.postMessage", &json!({ "channel": channel_id, "text": text })).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    use super::{MessageSender, SendError, SlackWebClient};

    #[derive(Clone, Default)]
    struct StubState {
        requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn post_message(
        State(state): State<StubState>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let channel = body["channel"].as_str().unwrap_or_default().to_owned();
        state.requests.lock().await.push((auth, body));

        if channel == "C404" {
            Json(json!({ "ok": false, "error": "channel_not_found" }))
        } else {
            Json(json!({ "ok": true, "channel": channel, "ts": "1730000000.9000" }))
        }
    }

    async fn auth_test() -> Json<Value> {
        Json(json!({ "ok": true, "user_id": "UBOT", "bot_id": "BBOT", "team": "Acme" }))
    }

    async fn slow() -> Json<Value> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Json(json!({ "ok": true }))
    }

    async fn unavailable() -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    async fn spawn_stub(state: StubState) -> String {
        let app = Router::new()
            .route("/api/chat.postMessage", post(post_message))
            .route("/api/auth.test", post(auth_test))
            .route("/slow/chat.postMessage", post(slow))
            .route("/down/chat.postMessage", post(unavailable))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let address = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{address}")
    }

    fn client(base_url: String, timeout: Duration) -> SlackWebClient {
        SlackWebClient::new(base_url, "xoxb-test".to_owned().into(), timeout).expect("client")
    }

    #[tokio::test]
    async fn send_posts_channel_and_text_with_bearer_token() {
        let state = StubState::default();
        let base = spawn_stub(state.clone()).await;
        let client = client(format!("{base}/api/"), Duration::from_secs(2));

        client.send("C1", "hello").await.expect("send should succeed");

        let requests = state.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0.as_deref(), Some("Bearer xoxb-test"));
        assert_eq!(requests[0].1, json!({ "channel": "C1", "text": "hello" }));
    }

    #[tokio::test]
    async fn api_level_error_is_reported_with_reason() {
        let base = spawn_stub(StubState::default()).await;
        let client = client(format!("{base}/api"), Duration::from_secs(2));

        let error = client.send("C404", "hello").await.expect_err("send should fail");

        assert_eq!(error, SendError::Api("channel_not_found".to_owned()));
    }

    #[tokio::test]
    async fn http_failure_is_reported_with_status() {
        let base = spawn_stub(StubState::default()).await;
        let client = client(format!("{base}/down"), Duration::from_secs(2));

        let error = client.send("C1", "hello").await.expect_err("send should fail");

        assert_eq!(error, SendError::Http { status: 503 });
    }

    #[tokio::test]
    async fn slow_api_is_bounded_by_timeout() {
        let base = spawn_stub(StubState::default()).await;
        let client = client(format!("{base}/slow"), Duration::from_millis(100));

        let error = client.send("C1", "hello").await.expect_err("send should time out");

        assert_eq!(error, SendError::Timeout);
    }

    #[tokio::test]
    async fn auth_test_resolves_bot_user_id() {
        let base = spawn_stub(StubState::default()).await;
        let client = client(format!("{base}/api"), Duration::from_secs(2));

        let identity = client.auth_test().await.expect("auth.test should succeed");

        assert_eq!(identity.user_id, "UBOT");
        assert_eq!(identity.bot_id.as_deref(), Some("BBOT"));
    }

    #[test]
    fn debug_output_omits_token() {
        let client = client("https://slack.com/api".to_owned(), Duration::from_secs(1));

        assert!(!format!("{client:?}").contains("xoxb-test"));
    }
}

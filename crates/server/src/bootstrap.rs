use std::sync::Arc;

use afterhours_core::config::{AppConfig, ConfigError, LoadOptions};
use afterhours_core::SystemClock;
use afterhours_slack::{AutoResponder, BotIdentity, ResponderSettings, SendError, SlackWebClient};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub responder: Arc<AutoResponder>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack client construction failed: {0}")]
    SlackClient(#[source] SendError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let client = SlackWebClient::from_config(&config.slack).map_err(BootstrapError::SlackClient)?;
    let bot_user_id = resolve_bot_user_id(&config, &client).await;

    // Inbound request signatures are not checked; the secret is only carried in config.
    warn!(
        event_name = "system.bootstrap.signature_verification_disabled",
        correlation_id = "bootstrap",
        signing_secret_configured = config.slack.signing_secret.is_some(),
        "slack request signature verification is not enabled"
    );

    let settings = ResponderSettings::from_config(&config)?;
    let identity = BotIdentity::new(bot_user_id, config.slack.system_user_ids.clone());
    info!(
        event_name = "system.bootstrap.responder_ready",
        correlation_id = "bootstrap",
        policy = settings.policy.as_str(),
        conversation_key = settings.conversation_key.as_str(),
        cooldown_secs = settings.cooldown_secs,
        start_hour = settings.office_hours.start_hour(),
        end_hour = settings.office_hours.end_hour(),
        timezone = %settings.office_hours.timezone(),
        bot_user_id = identity.user_id.as_deref().unwrap_or("unknown"),
        "auto-responder configured"
    );

    let responder =
        AutoResponder::new(settings, identity, Arc::new(client), Arc::new(SystemClock));

    Ok(Application { config, responder: Arc::new(responder) })
}

async fn resolve_bot_user_id(config: &AppConfig, client: &SlackWebClient) -> Option<String> {
    if let Some(user_id) = &config.slack.bot_user_id {
        return Some(user_id.clone());
    }

    match client.auth_test().await {
        Ok(identity) => {
            info!(
                event_name = "system.bootstrap.bot_identity_resolved",
                correlation_id = "bootstrap",
                bot_user_id = %identity.user_id,
                team = identity.team.as_deref().unwrap_or("unknown"),
                "resolved bot identity via auth.test"
            );
            Some(identity.user_id)
        }
        Err(error) => {
            warn!(
                event_name = "system.bootstrap.bot_identity_unresolved",
                correlation_id = "bootstrap",
                error = %error,
                "could not resolve bot identity; mentions are detected from app_mention events only"
            );
            None
        }
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use afterhours_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    CommandResult { exit_code: 0, output: render(&config) }
}

pub fn render(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let slack = &config.slack;
    let office_hours = &config.office_hours;
    let responder = &config.responder;
    let server = &config.server;

    let signing_secret = if slack.signing_secret.is_some() { "<redacted>" } else { "<unset>" };
    let fields: &[(&str, String, &[&str])] = &[
        (
            "slack.bot_token",
            redact_token(slack.bot_token.expose_secret()),
            &["AFTERHOURS_SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"],
        ),
        (
            "slack.signing_secret",
            signing_secret.to_string(),
            &["AFTERHOURS_SLACK_SIGNING_SECRET", "SLACK_SIGNING_SECRET"],
        ),
        (
            "slack.bot_user_id",
            slack.bot_user_id.clone().unwrap_or_else(|| "<auth.test>".to_string()),
            &["AFTERHOURS_SLACK_BOT_USER_ID"],
        ),
        (
            "slack.system_user_ids",
            slack.system_user_ids.join(","),
            &["AFTERHOURS_SLACK_SYSTEM_USER_IDS"],
        ),
        ("slack.api_base_url", slack.api_base_url.clone(), &["AFTERHOURS_SLACK_API_BASE_URL"]),
        (
            "slack.send_timeout_secs",
            slack.send_timeout_secs.to_string(),
            &["AFTERHOURS_SLACK_SEND_TIMEOUT_SECS"],
        ),
        (
            "office_hours.start_hour",
            office_hours.start_hour.to_string(),
            &["AFTERHOURS_OFFICE_HOURS_START_HOUR"],
        ),
        (
            "office_hours.end_hour",
            office_hours.end_hour.to_string(),
            &["AFTERHOURS_OFFICE_HOURS_END_HOUR"],
        ),
        (
            "office_hours.timezone",
            office_hours.timezone.clone(),
            &["AFTERHOURS_OFFICE_HOURS_TIMEZONE"],
        ),
        (
            "responder.cooldown_secs",
            responder.cooldown_secs.to_string(),
            &["AFTERHOURS_RESPONDER_COOLDOWN_SECS"],
        ),
        (
            "responder.policy",
            responder.policy.as_str().to_string(),
            &["AFTERHOURS_RESPONDER_POLICY"],
        ),
        (
            "responder.conversation_key",
            responder.conversation_key.as_str().to_string(),
            &["AFTERHOURS_RESPONDER_CONVERSATION_KEY"],
        ),
        (
            "responder.message_template",
            format!("{:?}", responder.message_template),
            &["AFTERHOURS_RESPONDER_MESSAGE_TEMPLATE"],
        ),
        (
            "responder.recipient_name",
            responder.recipient_name.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["AFTERHOURS_RESPONDER_RECIPIENT_NAME"],
        ),
        ("server.bind_address", server.bind_address.clone(), &["AFTERHOURS_SERVER_BIND_ADDRESS"]),
        ("server.port", server.port.to_string(), &["AFTERHOURS_SERVER_PORT", "PORT"]),
        (
            "server.graceful_shutdown_secs",
            server.graceful_shutdown_secs.to_string(),
            &["AFTERHOURS_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["AFTERHOURS_LOGGING_LEVEL", "AFTERHOURS_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["AFTERHOURS_LOGGING_FORMAT", "AFTERHOURS_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        fields
            .iter()
            .map(|&(key, ref value, env_keys)| render_line(key, value, source(key, env_keys))),
    );
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("afterhours.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/afterhours.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

pub(crate) fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

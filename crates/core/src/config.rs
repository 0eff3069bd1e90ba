use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cooldown::DEFAULT_COOLDOWN_SECS;
use crate::errors::DomainError;
use crate::office_hours::{parse_timezone, OfficeHours, DEFAULT_END_HOUR, DEFAULT_START_HOUR};
use crate::policy::{ConversationKeySource, RespondPolicy};

pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "Hi {author}, I'm not available right now. I'll reply during office hours. 😊";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub office_hours: OfficeHoursConfig,
    pub responder: ResponderConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub bot_token: SecretString,
    /// Loaded for completeness; inbound request signatures are not verified.
    pub signing_secret: Option<SecretString>,
    pub bot_user_id: Option<String>,
    pub system_user_ids: Vec<String>,
    pub api_base_url: String,
    pub send_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct OfficeHoursConfig {
    pub start_hour: u32,
    pub end_hour: u32,
    pub timezone: String,
}

#[derive(Clone, Debug)]
pub struct ResponderConfig {
    pub cooldown_secs: u64,
    pub policy: RespondPolicy,
    pub conversation_key: ConversationKeySource,
    pub message_template: String,
    pub recipient_name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub slack_bot_token: Option<String>,
    pub slack_signing_secret: Option<String>,
    pub slack_bot_user_id: Option<String>,
    pub timezone: Option<String>,
    pub cooldown_secs: Option<u64>,
    pub respond_policy: Option<RespondPolicy>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                bot_token: String::new().into(),
                signing_secret: None,
                bot_user_id: None,
                system_user_ids: vec!["USLACKBOT".to_string()],
                api_base_url: "https://slack.com/api".to_string(),
                send_timeout_secs: 3,
            },
            office_hours: OfficeHoursConfig {
                start_hour: DEFAULT_START_HOUR,
                end_hour: DEFAULT_END_HOUR,
                timezone: "UTC".to_string(),
            },
            responder: ResponderConfig {
                cooldown_secs: DEFAULT_COOLDOWN_SECS,
                policy: RespondPolicy::default(),
                conversation_key: ConversationKeySource::default(),
                message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
                recipient_name: None,
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl OfficeHoursConfig {
    pub fn window(&self) -> Result<OfficeHours, ConfigError> {
        let timezone = parse_timezone(&self.timezone).ok_or_else(|| {
            ConfigError::Validation(format!(
                "office_hours.timezone `{}` is not a known IANA timezone (e.g. `America/Bogota`)",
                self.timezone
            ))
        })?;

        Ok(OfficeHours::new(self.start_hour, self.end_hour, timezone)?)
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("afterhours.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(slack_bot_token_value) = slack.bot_token {
                self.slack.bot_token = secret_value(slack_bot_token_value);
            }
            if let Some(signing_secret_value) = slack.signing_secret {
                self.slack.signing_secret = non_empty(signing_secret_value).map(secret_value);
            }
            if let Some(bot_user_id) = slack.bot_user_id {
                self.slack.bot_user_id = non_empty(bot_user_id);
            }
            if let Some(system_user_ids) = slack.system_user_ids {
                self.slack.system_user_ids = system_user_ids;
            }
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
            if let Some(send_timeout_secs) = slack.send_timeout_secs {
                self.slack.send_timeout_secs = send_timeout_secs;
            }
        }

        if let Some(office_hours) = patch.office_hours {
            if let Some(start_hour) = office_hours.start_hour {
                self.office_hours.start_hour = start_hour;
            }
            if let Some(end_hour) = office_hours.end_hour {
                self.office_hours.end_hour = end_hour;
            }
            if let Some(timezone) = office_hours.timezone {
                self.office_hours.timezone = timezone;
            }
        }

        if let Some(responder) = patch.responder {
            if let Some(cooldown_secs) = responder.cooldown_secs {
                self.responder.cooldown_secs = cooldown_secs;
            }
            if let Some(policy) = responder.policy {
                self.responder.policy = policy;
            }
            if let Some(conversation_key) = responder.conversation_key {
                self.responder.conversation_key = conversation_key;
            }
            if let Some(message_template) = responder.message_template {
                self.responder.message_template = message_template;
            }
            if let Some(recipient_name) = responder.recipient_name {
                self.responder.recipient_name = non_empty(recipient_name);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let bot_token =
            read_env("AFTERHOURS_SLACK_BOT_TOKEN").or_else(|| read_env("SLACK_BOT_TOKEN"));
        if let Some(value) = bot_token {
            self.slack.bot_token = secret_value(value);
        }
        let signing_secret = read_env("AFTERHOURS_SLACK_SIGNING_SECRET")
            .or_else(|| read_env("SLACK_SIGNING_SECRET"));
        if let Some(value) = signing_secret {
            self.slack.signing_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("AFTERHOURS_SLACK_BOT_USER_ID") {
            self.slack.bot_user_id = Some(value);
        }
        if let Some(value) = read_env("AFTERHOURS_SLACK_SYSTEM_USER_IDS") {
            self.slack.system_user_ids = parse_list(&value);
        }
        if let Some(value) = read_env("AFTERHOURS_SLACK_API_BASE_URL") {
            self.slack.api_base_url = value;
        }
        if let Some(value) = read_env("AFTERHOURS_SLACK_SEND_TIMEOUT_SECS") {
            self.slack.send_timeout_secs = parse_u64("AFTERHOURS_SLACK_SEND_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AFTERHOURS_OFFICE_HOURS_START_HOUR") {
            self.office_hours.start_hour =
                parse_u32("AFTERHOURS_OFFICE_HOURS_START_HOUR", &value)?;
        }
        if let Some(value) = read_env("AFTERHOURS_OFFICE_HOURS_END_HOUR") {
            self.office_hours.end_hour = parse_u32("AFTERHOURS_OFFICE_HOURS_END_HOUR", &value)?;
        }
        if let Some(value) = read_env("AFTERHOURS_OFFICE_HOURS_TIMEZONE") {
            self.office_hours.timezone = value;
        }

        if let Some(value) = read_env("AFTERHOURS_RESPONDER_COOLDOWN_SECS") {
            self.responder.cooldown_secs =
                parse_u64("AFTERHOURS_RESPONDER_COOLDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("AFTERHOURS_RESPONDER_POLICY") {
            self.responder.policy = value.parse()?;
        }
        if let Some(value) = read_env("AFTERHOURS_RESPONDER_CONVERSATION_KEY") {
            self.responder.conversation_key = value.parse()?;
        }
        if let Some(value) = read_env("AFTERHOURS_RESPONDER_MESSAGE_TEMPLATE") {
            self.responder.message_template = value;
        }
        if let Some(value) = read_env("AFTERHOURS_RESPONDER_RECIPIENT_NAME") {
            self.responder.recipient_name = Some(value);
        }

        if let Some(value) = read_env("AFTERHOURS_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("AFTERHOURS_SERVER_PORT") {
            self.server.port = parse_u16("AFTERHOURS_SERVER_PORT", &value)?;
        } else if let Some(value) = read_env("PORT") {
            self.server.port = parse_u16("PORT", &value)?;
        }
        if let Some(value) = read_env("AFTERHOURS_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("AFTERHOURS_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("AFTERHOURS_LOGGING_LEVEL").or_else(|| read_env("AFTERHOURS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AFTERHOURS_LOGGING_FORMAT").or_else(|| read_env("AFTERHOURS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(slack_bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(slack_bot_token);
        }
        if let Some(signing_secret) = overrides.slack_signing_secret {
            self.slack.signing_secret = Some(secret_value(signing_secret));
        }
        if let Some(bot_user_id) = overrides.slack_bot_user_id {
            self.slack.bot_user_id = Some(bot_user_id);
        }
        if let Some(timezone) = overrides.timezone {
            self.office_hours.timezone = timezone;
        }
        if let Some(cooldown_secs) = overrides.cooldown_secs {
            self.responder.cooldown_secs = cooldown_secs;
        }
        if let Some(policy) = overrides.respond_policy {
            self.responder.policy = policy;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        self.office_hours.window()?;
        validate_responder(&self.responder)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("afterhours.toml"), PathBuf::from("config/afterhours.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let bot_token = slack.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required. Get it from https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token".to_string()
        ));
    }
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used the app-level token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    if !slack.api_base_url.starts_with("http://") && !slack.api_base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation(
            "slack.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if slack.send_timeout_secs == 0 || slack.send_timeout_secs > 30 {
        return Err(ConfigError::Validation(
            "slack.send_timeout_secs must be in range 1..=30".to_string(),
        ));
    }

    Ok(())
}

fn validate_responder(responder: &ResponderConfig) -> Result<(), ConfigError> {
    if responder.cooldown_secs == 0 {
        return Err(ConfigError::Validation(
            "responder.cooldown_secs must be greater than zero".to_string(),
        ));
    }

    if responder.message_template.trim().is_empty() {
        return Err(ConfigError::Validation(
            "responder.message_template must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn non_empty(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    office_hours: Option<OfficeHoursPatch>,
    responder: Option<ResponderPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    bot_token: Option<String>,
    signing_secret: Option<String>,
    bot_user_id: Option<String>,
    system_user_ids: Option<Vec<String>>,
    api_base_url: Option<String>,
    send_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OfficeHoursPatch {
    start_hour: Option<u32>,
    end_hour: Option<u32>,
    timezone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponderPatch {
    cooldown_secs: Option<u64>,
    policy: Option<RespondPolicy>,
    conversation_key: Option<ConversationKeySource>,
    message_template: Option<String>,
    recipient_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

use afterhours_core::config::ResponderConfig;

const RECIPIENT_FALLBACK: &str = "the person you wrote to";

/// Canned out-of-office text.
///
/// `{author}` becomes a mention of the message author and `{recipient}` the configured recipient
/// name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyTemplate {
    template: String,
    recipient_name: Option<String>,
}

impl ReplyTemplate {
    pub fn new(template: impl Into<String>, recipient_name: Option<String>) -> Self {
        Self { template: template.into(), recipient_name }
    }

    pub fn from_config(config: &ResponderConfig) -> Self {
        Self::new(config.message_template.clone(), config.recipient_name.clone())
    }

    pub fn render(&self, author_id: &str) -> String {
        let recipient = self.recipient_name.as_deref().unwrap_or(RECIPIENT_FALLBACK);
        let author = format!("<@{author_id}>");
        self.template.replace("{author}", &author).replace("{recipient}", recipient)
    }
}

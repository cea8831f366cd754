use async_trait::async_trait;
use serde::Serialize;
use tic_core::config::TelegramConfig;
use tic_core::notify::entity::Recipient;
use tic_core::notify::error::NotifyError;
use tic_core::notify::port::Notifier;

/// # Summary
/// Posts back-office alerts (new deposits, withdrawal requests, bulk review
/// summaries) to an operations chat through the Telegram Bot API.
///
/// # Invariants
/// * Only [`Recipient::Admin`] is deliverable; users are never messaged here.
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

/// Payload of the `sendMessage` call.
#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(cfg: &TelegramConfig) -> Self {
        Self::new(cfg.bot_token.clone(), cfg.chat_id.clone())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// # Summary
    /// Sends `subject` (bold) and `content` to the configured chat.
    ///
    /// # Returns
    /// * `Err(NotifyError::Unsupported)` for non-admin recipients.
    /// * `Err(NotifyError::Platform)` if the Bot API answers with an error.
    async fn notify(&self, recipient: &Recipient, subject: &str, content: &str) -> Result<(), NotifyError> {
        if *recipient != Recipient::Admin {
            return Err(NotifyError::Unsupported(recipient.to_string()));
        }

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = TelegramMessage {
            chat_id: &self.chat_id,
            text: format!("*{}*\n{}", subject, content),
            parse_mode: "Markdown",
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Platform(format!(
                "Telegram API error: {}",
                error_text
            )));
        }

        Ok(())
    }
}

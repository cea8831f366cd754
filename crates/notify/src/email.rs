use async_trait::async_trait;
use lettre::message::{Mailbox, Message, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tic_core::config::EmailConfig;
use tic_core::notify::entity::Recipient;
use tic_core::notify::error::NotifyError;
use tic_core::notify::port::Notifier;

/// # Summary
/// Sends notifications over SMTP: verification codes and password-reset
/// links to users, alerts to the back-office inbox.
///
/// # Invariants
/// - The `AsyncSmtpTransport` is built once and reused.
/// - Phone recipients are not reachable through this channel.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    admin_to: Mailbox,
}

impl EmailNotifier {
    /// # Summary
    /// Creates a new `EmailNotifier`.
    ///
    /// # Logic
    /// 1. Parses the sender and admin addresses up front.
    /// 2. Configures the relay transport (submission port, STARTTLS) with
    ///    the SMTP credentials.
    ///
    /// # Arguments
    /// * `host` - SMTP relay, e.g. `smtp.gmail.com`.
    /// * `admin_to` - inbox receiving [`Recipient::Admin`] messages.
    ///
    /// # Returns
    /// * `Err(NotifyError::Config)` on an invalid host or address.
    pub fn new(host: &str, user: &str, pass: &str, from: &str, admin_to: &str) -> Result<Self, NotifyError> {
        let creds = Credentials::new(user.to_string(), pass.to_string());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| NotifyError::Config(format!("Invalid SMTP host: {}", e)))?
            .credentials(creds)
            .build();

        Ok(Self {
            mailer,
            from: parse_mailbox(from, "from")?,
            admin_to: parse_mailbox(admin_to, "admin_to")?,
        })
    }

    pub fn from_config(cfg: &EmailConfig) -> Result<Self, NotifyError> {
        Self::new(&cfg.host, &cfg.user, &cfg.pass, &cfg.from, &cfg.admin_to)
    }
}

fn parse_mailbox(raw: &str, field: &str) -> Result<Mailbox, NotifyError> {
    raw.parse()
        .map_err(|e| NotifyError::Config(format!("Invalid {} address '{}': {}", field, raw, e)))
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, recipient: &Recipient, subject: &str, content: &str) -> Result<(), NotifyError> {
        let to = match recipient {
            Recipient::Admin => self.admin_to.clone(),
            Recipient::Email(addr) => parse_mailbox(addr, "recipient")?,
            Recipient::Phone(_) => {
                return Err(NotifyError::Unsupported(recipient.to_string()));
            }
        };

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(content.to_string())
            .map_err(|e| NotifyError::Platform(format!("Failed to build email: {}", e)))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Network(format!("SMTP error: {}", e)))?;

        tracing::debug!("Email '{}' sent to {}", subject, recipient);
        Ok(())
    }
}

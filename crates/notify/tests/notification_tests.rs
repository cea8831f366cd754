use async_trait::async_trait;
use std::env;
use std::sync::Arc;
use tic_core::config::{NotifyConfig, TelegramConfig};
use tic_core::notify::entity::Recipient;
use tic_core::notify::error::NotifyError;
use tic_core::notify::port::Notifier;
use tic_core::test_utils::RecordingNotifier;
use tic_notify::email::EmailNotifier;
use tic_notify::fanout::FanoutNotifier;
use tic_notify::log::LogNotifier;
use tic_notify::telegram::TelegramNotifier;

/// reqwest is built without a bundled TLS provider; the binary installs
/// ring at startup and the tests do the same.
fn install_crypto_provider() {
    // Err: another test got there first.
    rustls::crypto::ring::default_provider().install_default().ok();
}

/// Channel that always fails with a transport error.
struct BrokenChannel;

#[async_trait]
impl Notifier for BrokenChannel {
    async fn notify(&self, _: &Recipient, _: &str, _: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Network("connection refused".into()))
    }
}

/// Channel that only reaches admins.
struct AdminOnly;

#[async_trait]
impl Notifier for AdminOnly {
    async fn notify(&self, recipient: &Recipient, _: &str, _: &str) -> Result<(), NotifyError> {
        match recipient {
            Recipient::Admin => Ok(()),
            other => Err(NotifyError::Unsupported(other.to_string())),
        }
    }
}

#[tokio::test]
async fn test_fanout_survives_a_broken_channel() {
    let recorder = Arc::new(RecordingNotifier::new());
    let fanout = FanoutNotifier::new(vec![Arc::new(BrokenChannel), recorder.clone()]);

    let to = Recipient::Email("user@example.com".into());
    fanout
        .notify(&to, "Verification code", "Your code is 123456")
        .await
        .unwrap();

    let sent = recorder.last_to(&to).await.unwrap();
    assert_eq!(sent.subject, "Verification code");
}

#[tokio::test]
async fn test_fanout_reports_unreachable_recipient() {
    let fanout = FanoutNotifier::new(vec![Arc::new(AdminOnly)]);
    assert!(fanout.notify(&Recipient::Admin, "New deposit", "42 USD").await.is_ok());

    let result = fanout
        .notify(&Recipient::Phone("+2348000000000".into()), "Code", "123456")
        .await;
    assert!(matches!(result, Err(NotifyError::Unsupported(_))));

    let broken = FanoutNotifier::new(vec![Arc::new(BrokenChannel), Arc::new(AdminOnly)]);
    let result = broken
        .notify(&Recipient::Email("a@b.com".into()), "Code", "1")
        .await;
    assert!(matches!(result, Err(NotifyError::Network(_))));
}

#[tokio::test]
async fn test_default_config_logs_only() {
    let fanout = FanoutNotifier::from_config(&NotifyConfig::default()).unwrap();
    assert_eq!(fanout.channel_count(), 1);
    assert!(LogNotifier
        .notify(&Recipient::Phone("+15550100".into()), "Code", "654321")
        .await
        .is_ok());
    assert!(fanout
        .notify(&Recipient::Phone("+15550100".into()), "Code", "654321")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_telegram_config_builds_channel() {
    install_crypto_provider();
    let cfg = NotifyConfig {
        telegram: Some(TelegramConfig {
            bot_token: "123:abc".into(),
            chat_id: "-100200".into(),
        }),
        ..NotifyConfig::default()
    };
    let fanout = FanoutNotifier::from_config(&cfg).unwrap();
    assert_eq!(fanout.channel_count(), 2);

    // The log channel still delivers user-facing codes.
    assert!(fanout
        .notify(&Recipient::Phone("+15550100".into()), "Code", "111222")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_channels_refuse_unsupported_recipients() {
    install_crypto_provider();
    let telegram = TelegramNotifier::new("token".into(), "chat".into());
    let result = telegram
        .notify(&Recipient::Email("user@example.com".into()), "Hi", "there")
        .await;
    assert!(matches!(result, Err(NotifyError::Unsupported(_))));

    let email = EmailNotifier::new("smtp.example.com", "u", "p", "noreply@example.com", "ops@example.com").unwrap();
    let result = email
        .notify(&Recipient::Phone("+15550100".into()), "Hi", "there")
        .await;
    assert!(matches!(result, Err(NotifyError::Unsupported(_))));

    assert!(matches!(
        EmailNotifier::new("smtp.example.com", "u", "p", "not an address", "ops@example.com"),
        Err(NotifyError::Config(_))
    ));
}

/// # Summary
/// Sends a real message to the configured Telegram ops chat.
///
/// # Logic
/// 1. Loads `.env`.
/// 2. Reads `TIC_TG_BOT_TOKEN` / `TIC_TG_CHAT_ID`.
/// 3. Sends one admin alert.
#[tokio::test]
#[ignore] // needs real credentials
async fn test_telegram_notification() {
    install_crypto_provider();
    dotenvy::dotenv().ok();
    let bot_token = env::var("TIC_TG_BOT_TOKEN").expect("TIC_TG_BOT_TOKEN must be set");
    let chat_id = env::var("TIC_TG_CHAT_ID").expect("TIC_TG_CHAT_ID must be set");

    let notifier = TelegramNotifier::new(bot_token, chat_id);
    let result = notifier
        .notify(&Recipient::Admin, "TIC GLOBAL test", "Telegram integration test message")
        .await;

    assert!(result.is_ok(), "Telegram notification failed: {:?}", result);
}

/// # Summary
/// Sends a real email through the configured SMTP relay.
#[tokio::test]
#[ignore] // needs real credentials
async fn test_email_notification() {
    dotenvy::dotenv().ok();
    let host = env::var("TIC_EMAIL_HOST").expect("TIC_EMAIL_HOST must be set");
    let user = env::var("TIC_EMAIL_USER").expect("TIC_EMAIL_USER must be set");
    let pass = env::var("TIC_EMAIL_PASS").expect("TIC_EMAIL_PASS must be set");
    let from = env::var("TIC_EMAIL_FROM").expect("TIC_EMAIL_FROM must be set");
    let to = env::var("TIC_EMAIL_TO").expect("TIC_EMAIL_TO must be set");

    let notifier = EmailNotifier::new(&host, &user, &pass, &from, &to).expect("valid SMTP config");
    let result = notifier
        .notify(&Recipient::Email(to.clone()), "TIC GLOBAL test", "Email integration test message")
        .await;

    assert!(result.is_ok(), "Email notification failed: {:?}", result);
}

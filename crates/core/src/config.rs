use serde::{Deserialize, Serialize};

/// Global application configuration.
///
/// Every section carries `#[serde(default)]` so a partial TOML file or a
/// handful of `TIC__*` environment variables is enough to start the server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub admin: AdminConfig,
    pub referral: ReferralConfig,
    pub logging: LoggingConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Lifetime of a regular user session token, in seconds.
    pub user_token_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub data_dir: String,
}

/// # Summary
/// Back-office access settings.
///
/// # Invariants
/// - Only accounts whose role is `admin` AND whose email appears in `emails`
///   may call admin routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub emails: Vec<String>,
    pub token_ttl_secs: u64,
    /// When set, the allow-listed admin accounts are created (or their
    /// password reset) at start-up.
    pub bootstrap_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub file_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotifyConfig {
    pub email: Option<EmailConfig>,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub from: String,
    /// Inbox receiving back-office alerts.
    pub admin_to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "CHANGE_ME_JWT_SECRET".to_string(),
            user_token_ttl_secs: 86400 * 7,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            emails: vec!["admin@ticgloballtd.com".to_string()],
            token_ttl_secs: 86400,
            bootstrap_password: None,
        }
    }
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ticgloballtd.com".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            file_prefix: "tic.log".to_string(),
        }
    }
}

impl AdminConfig {
    /// Case-insensitive allow-list membership.
    pub fn is_allowed(&self, email: &str) -> bool {
        self.emails
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(email.trim()))
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Destination of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Back-office channel (admin inbox, Telegram ops chat).
    Admin,
    Email(String),
    Phone(String),
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Admin => write!(f, "admin"),
            Recipient::Email(addr) => write!(f, "email:{}", addr),
            Recipient::Phone(number) => write!(f, "phone:{}", number),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

impl fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationPriority::Low => write!(f, "low"),
            NotificationPriority::Medium => write!(f, "medium"),
            NotificationPriority::High => write!(f, "high"),
        }
    }
}

impl FromStr for NotificationPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(NotificationPriority::Low),
            "medium" => Ok(NotificationPriority::Medium),
            "high" => Ok(NotificationPriority::High),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// # Summary
/// In-app notification shown in the user's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_email: String,
    pub title: String,
    pub message: String,
    /// Free-form category, e.g. `deposit`, `withdrawal`, `system`.
    pub kind: String,
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        id: String,
        user_email: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: impl Into<String>,
        priority: NotificationPriority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_email: user_email.into(),
            title: title.into(),
            message: message.into(),
            kind: kind.into(),
            priority,
            is_read: false,
            created_at: now,
        }
    }
}

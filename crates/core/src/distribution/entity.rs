use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Cancelled => write!(f, "cancelled"),
            SubscriptionStatus::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "expired" => Ok(SubscriptionStatus::Expired),
            _ => Err(format!("Invalid subscription status: {}", s)),
        }
    }
}

/// # Summary
/// Paid plan entitling the user to a daily TIC allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_email: String,
    /// `vip` or `starter`.
    pub plan_id: String,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date >= now
    }
}

/// Outcome of crediting one subscription for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    Credited,
    /// A distribution row for `(subscription, date)` already exists.
    AlreadyDistributed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistributionItemStatus {
    Distributed,
    Skipped,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionItem {
    pub subscription_id: String,
    pub user_email: String,
    pub plan_id: String,
    pub status: DistributionItemStatus,
    pub token_amount: Decimal,
    pub reason: Option<String>,
}

/// Summary of one distribution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionReport {
    pub date: NaiveDate,
    pub total_subscriptions: usize,
    pub distributed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total_tokens_distributed: Decimal,
    pub items: Vec<DistributionItem>,
}

/// What has already been distributed on a given day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionDaySummary {
    pub date: NaiveDate,
    pub distributions: u64,
    pub total_tokens: Decimal,
}

/// One daily credit, as shown in a user's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionRecord {
    pub subscription_id: String,
    pub plan_id: String,
    pub plan_name: String,
    pub date: NaiveDate,
    pub token_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DistributionTotals {
    pub count: u64,
    pub total_tokens: Decimal,
}

impl DistributionTotals {
    /// Mean credit, zero when nothing was credited.
    pub fn average(&self) -> Decimal {
        if self.count == 0 {
            Decimal::ZERO
        } else {
            self.total_tokens / Decimal::from(self.count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_subscription_activity_window() {
        let now = Utc::now();
        let mut sub = Subscription {
            id: "s1".into(),
            user_email: "a@b.com".into(),
            plan_id: "vip".into(),
            plan_name: "VIP".into(),
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: now + Duration::days(1),
            created_at: now,
        };
        assert!(sub.is_active_at(now));
        assert!(!sub.is_active_at(now + Duration::days(2)));
        sub.status = SubscriptionStatus::Cancelled;
        assert!(!sub.is_active_at(now));
    }

    #[test]
    fn test_average_of_empty_totals_is_zero() {
        assert_eq!(DistributionTotals::default().average(), Decimal::ZERO);
        let totals = DistributionTotals {
            count: 4,
            total_tokens: dec!(10),
        };
        assert_eq!(totals.average(), dec!(2.5));
    }
}

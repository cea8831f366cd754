use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What earned a commission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommissionKind {
    /// One-off reward when a downline member buys a VIP plan.
    PlanPurchase,
    /// Daily reward per active VIP plan held in the downline.
    UnilevelDaily,
}

impl fmt::Display for CommissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommissionKind::PlanPurchase => write!(f, "plan_purchase"),
            CommissionKind::UnilevelDaily => write!(f, "unilevel_daily"),
        }
    }
}

impl FromStr for CommissionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plan_purchase" => Ok(CommissionKind::PlanPurchase),
            "unilevel_daily" => Ok(CommissionKind::UnilevelDaily),
            _ => Err(format!("Invalid commission type: {}", s)),
        }
    }
}

/// # Summary
/// One commission credited to a referrer's partner wallet.
///
/// # Invariants
/// - `(earner_email, referred_email, kind, source_id)` is unique; crediting
///   the same source twice is a no-op.
/// - `amount` is USD and positive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommissionEarning {
    pub id: String,
    pub earner_email: String,
    /// Downline member whose plan produced the commission.
    pub referred_email: String,
    /// Depth of `referred_email` below the earner, starting at 1.
    pub level: u32,
    pub kind: CommissionKind,
    pub rate: Decimal,
    /// USD the rate was applied to.
    pub base_amount: Decimal,
    pub amount: Decimal,
    /// Payment id for purchases, `YYYY-MM-DD` for daily runs.
    pub source_id: String,
    pub earning_date: NaiveDate,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A member of a referrer's network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkMember {
    pub email: String,
    pub level: u32,
    /// Referrer one level up.
    pub referrer_email: String,
    pub referral_code: String,
    pub joined_at: DateTime<Utc>,
}

/// Filter of the commission history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommissionFilter {
    pub kind: Option<CommissionKind>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommissionSummary {
    pub total_earned: Decimal,
    pub total_count: u64,
    pub purchase_earned: Decimal,
    pub daily_earned: Decimal,
}

/// Per-level totals of one daily run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LevelTotal {
    pub level: u32,
    pub count: u64,
    pub amount: Decimal,
}

/// What a daily unilevel run (or the stored rows of a day) amounts to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnilevelReport {
    pub date: NaiveDate,
    pub earners_processed: usize,
    pub credited: usize,
    /// Commissions already credited for the day.
    pub skipped: usize,
    pub errors: usize,
    pub total_amount: Decimal,
    pub by_level: Vec<LevelTotal>,
}

impl UnilevelReport {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            earners_processed: 0,
            credited: 0,
            skipped: 0,
            errors: 0,
            total_amount: Decimal::ZERO,
            by_level: Vec::new(),
        }
    }

    /// Adds `amount` to the level bucket, keeping buckets sorted by level.
    pub fn add_to_level(&mut self, level: u32, amount: Decimal) {
        match self.by_level.binary_search_by_key(&level, |t| t.level) {
            Ok(idx) => {
                if let Some(total) = self.by_level.get_mut(idx) {
                    total.count += 1;
                    total.amount += amount;
                }
            }
            Err(idx) => self.by_level.insert(
                idx,
                LevelTotal {
                    level,
                    count: 1,
                    amount,
                },
            ),
        }
    }
}

//! Commission rates of the referral programme.

use super::entity::{CommissionEarning, CommissionKind};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// USD base a single VIP plan contributes per day (and per purchase).
pub const DAILY_COMMISSION_BASE: Decimal = Decimal::from_parts(44, 0, 0, false, 2);

/// Deepest level paid on a VIP purchase.
pub const PURCHASE_COMMISSION_DEPTH: u32 = 2;

/// Deepest level paid by the daily run to an earner holding a VIP plan.
pub const VIP_UNILEVEL_DEPTH: u32 = 15;

/// Deepest level paid by the daily run to an earner without a VIP plan.
pub const BASIC_UNILEVEL_DEPTH: u32 = 1;

/// Plan whose holders feed commissions.
pub const COMMISSION_PLAN_ID: &str = "vip";

/// Rate paid on a VIP purchase `level` steps below the earner.
pub fn purchase_rate(level: u32) -> Decimal {
    match level {
        1 => Decimal::new(10, 2),
        2 => Decimal::new(5, 2),
        _ => Decimal::ZERO,
    }
}

/// Daily rate paid on VIP plans held `level` steps below the earner.
pub fn unilevel_rate(level: u32) -> Decimal {
    match level {
        1 => Decimal::new(10, 2),
        2..=6 => Decimal::new(5, 2),
        7..=10 => Decimal::new(25, 3),
        11..=15 => Decimal::new(1, 2),
        _ => Decimal::ZERO,
    }
}

pub fn unilevel_depth(earner_holds_vip: bool) -> u32 {
    if earner_holds_vip {
        VIP_UNILEVEL_DEPTH
    } else {
        BASIC_UNILEVEL_DEPTH
    }
}

/// Commission on `plans` VIP plans at `rate`.
pub fn commission_amount(rate: Decimal, plans: u32) -> Decimal {
    DAILY_COMMISSION_BASE * rate * Decimal::from(plans)
}

/// # Summary
/// Commissions owed to the upline of a VIP buyer.
///
/// # Arguments
/// * `upline` - referrers of the buyer, nearest first (index 0 is the
///   direct referrer, level 1).
/// * `payment_id` - source of the commissions; identical inputs yield
///   identical `(earner, referred, kind, source)` keys.
pub fn purchase_commissions(
    buyer_email: &str,
    upline: &[String],
    payment_id: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
    mut next_id: impl FnMut() -> String,
) -> Vec<CommissionEarning> {
    (1..=PURCHASE_COMMISSION_DEPTH)
        .zip(upline)
        .filter_map(|(level, earner)| {
            let rate = purchase_rate(level);
            if rate.is_zero() || earner == buyer_email {
                return None;
            }
            Some(CommissionEarning {
                id: next_id(),
                earner_email: earner.clone(),
                referred_email: buyer_email.to_string(),
                level,
                kind: CommissionKind::PlanPurchase,
                rate,
                base_amount: DAILY_COMMISSION_BASE,
                amount: commission_amount(rate, 1),
                source_id: payment_id.to_string(),
                earning_date: date,
                description: format!("Level {} VIP purchase commission from {}", level, buyer_email),
                created_at: now,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_tables() {
        assert_eq!(DAILY_COMMISSION_BASE, dec!(0.44));
        assert_eq!(unilevel_rate(1), dec!(0.10));
        assert_eq!(unilevel_rate(6), dec!(0.05));
        assert_eq!(unilevel_rate(7), dec!(0.025));
        assert_eq!(unilevel_rate(15), dec!(0.01));
        assert_eq!(unilevel_rate(16), Decimal::ZERO);
        assert_eq!(unilevel_rate(0), Decimal::ZERO);
        assert_eq!(purchase_rate(3), Decimal::ZERO);
        assert_eq!(unilevel_depth(true), 15);
        assert_eq!(unilevel_depth(false), 1);
    }

    #[test]
    fn test_commission_amount_scales_with_plans() {
        assert_eq!(commission_amount(dec!(0.10), 1), dec!(0.044));
        assert_eq!(commission_amount(dec!(0.025), 4), dec!(0.044));
        assert_eq!(commission_amount(dec!(0.05), 0), Decimal::ZERO);
    }

    #[test]
    fn test_purchase_commissions_stop_at_second_level() {
        let upline = vec!["a@x.com".to_string(), "b@x.com".to_string(), "c@x.com".to_string()];
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut n = 0;
        let earnings = purchase_commissions("buyer@x.com", &upline, "pay1", date, Utc::now(), || {
            n += 1;
            format!("c{}", n)
        });

        assert_eq!(earnings.len(), 2);
        assert_eq!(earnings[0].earner_email, "a@x.com");
        assert_eq!(earnings[0].amount, dec!(0.044));
        assert_eq!(earnings[1].earner_email, "b@x.com");
        assert_eq!(earnings[1].amount, dec!(0.022));
        assert!(earnings.iter().all(|e| e.source_id == "pay1" && e.referred_email == "buyer@x.com"));
        assert_eq!(earnings[1].id, "c2");
    }
}

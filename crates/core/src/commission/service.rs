use super::entity::{CommissionEarning, CommissionKind, UnilevelReport};
use super::port::CommissionStore;
use super::rules::{DAILY_COMMISSION_BASE, commission_amount, unilevel_depth, unilevel_rate};
use crate::common::id::new_id;
use crate::distribution::entity::CreditOutcome;
use crate::store::error::StoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// # Summary
/// Pays the daily unilevel commissions for `now`'s UTC date.
///
/// # Logic
/// 1. Counts the active VIP plans of every holder.
/// 2. For each referrer, walks the downline 15 levels deep when the
///    referrer holds a VIP plan, one level otherwise.
/// 3. Each member holding VIP plans earns the referrer
///    `0.44 * rate(level) * plans`, credited in its own transaction; a
///    commission already paid for the day is skipped.
///
/// # Returns
/// * `Err` only if the holdings or the referrer list cannot be loaded.
pub async fn run_unilevel_distribution(
    store: &dyn CommissionStore,
    now: DateTime<Utc>,
) -> Result<UnilevelReport, StoreError> {
    let date = now.date_naive();
    let source_id = date.format("%Y-%m-%d").to_string();
    let vip_counts = store.active_vip_counts(now).await?;
    let earners = store.referrers().await?;

    let mut report = UnilevelReport::empty(date);

    for earner in earners {
        report.earners_processed += 1;
        let depth = unilevel_depth(vip_counts.contains_key(&earner));
        let network = match store.downline(&earner, depth).await {
            Ok(network) => network,
            Err(e) => {
                tracing::error!("Failed to load the network of {}: {}", earner, e);
                report.errors += 1;
                continue;
            }
        };

        for member in network {
            let plans = vip_counts.get(&member.email).copied().unwrap_or(0);
            let rate = unilevel_rate(member.level);
            if plans == 0 || rate.is_zero() {
                continue;
            }

            let amount = commission_amount(rate, plans);
            let earning = CommissionEarning {
                id: new_id(),
                earner_email: earner.clone(),
                referred_email: member.email.clone(),
                level: member.level,
                kind: CommissionKind::UnilevelDaily,
                rate,
                base_amount: DAILY_COMMISSION_BASE * Decimal::from(plans),
                amount,
                source_id: source_id.clone(),
                earning_date: date,
                description: format!(
                    "Level {} daily commission ({} VIP plan(s) of {})",
                    member.level, plans, member.email
                ),
                created_at: now,
            };

            match store.credit(&earning, now).await {
                Ok(CreditOutcome::Credited) => {
                    report.credited += 1;
                    report.total_amount += amount;
                    report.add_to_level(member.level, amount);
                }
                Ok(CreditOutcome::AlreadyDistributed) => report.skipped += 1,
                Err(e) => {
                    tracing::error!(
                        "Commission for {} from {} failed: {}",
                        earner,
                        member.email,
                        e
                    );
                    report.errors += 1;
                }
            }
        }
    }

    tracing::info!(
        "Unilevel commissions {}: {} credited, {} skipped, {} errors, {} USD",
        date,
        report.credited,
        report.skipped,
        report.errors,
        report.total_amount
    );
    Ok(report)
}

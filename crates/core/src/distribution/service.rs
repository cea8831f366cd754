use super::entity::{
    CreditOutcome, DistributionItem, DistributionItemStatus, DistributionReport,
};
use super::port::DistributionStore;
use crate::store::error::StoreError;
use crate::wallet::pricing::daily_allocation;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// # Summary
/// Runs the daily TIC distribution for `now`'s UTC date.
///
/// # Logic
/// 1. Loads active, unexpired subscriptions.
/// 2. Plans without an allocation are skipped.
/// 3. Each subscription is credited in its own transaction, so one failure
///    does not block the others; repeats on the same day are skipped.
///
/// # Returns
/// * `Err` only if the subscription list itself cannot be loaded.
pub async fn run_daily_distribution(
    store: &dyn DistributionStore,
    now: DateTime<Utc>,
) -> Result<DistributionReport, StoreError> {
    let date = now.date_naive();
    let subscriptions = store.active_subscriptions(now).await?;

    let mut report = DistributionReport {
        date,
        total_subscriptions: subscriptions.len(),
        distributed: 0,
        skipped: 0,
        errors: 0,
        total_tokens_distributed: Decimal::ZERO,
        items: Vec::with_capacity(subscriptions.len()),
    };

    for sub in subscriptions {
        let tokens = daily_allocation(&sub.plan_id);
        let mut item = DistributionItem {
            subscription_id: sub.id.clone(),
            user_email: sub.user_email.clone(),
            plan_id: sub.plan_id.clone(),
            status: DistributionItemStatus::Skipped,
            token_amount: Decimal::ZERO,
            reason: None,
        };

        if tokens <= Decimal::ZERO {
            item.reason = Some("No token allocation for plan".into());
            report.skipped += 1;
            report.items.push(item);
            continue;
        }

        match store.credit_daily(&sub, date, tokens, now).await {
            Ok(CreditOutcome::Credited) => {
                item.status = DistributionItemStatus::Distributed;
                item.token_amount = tokens;
                report.distributed += 1;
                report.total_tokens_distributed += tokens;
            }
            Ok(CreditOutcome::AlreadyDistributed) => {
                item.reason = Some("Already distributed today".into());
                report.skipped += 1;
            }
            Err(e) => {
                tracing::error!("Distribution failed for subscription {}: {}", sub.id, e);
                item.status = DistributionItemStatus::Error;
                item.reason = Some("Failed to credit tokens".into());
                report.errors += 1;
            }
        }
        report.items.push(item);
    }

    tracing::info!(
        "Daily TIC distribution {}: {} distributed, {} skipped, {} errors",
        date,
        report.distributed,
        report.skipped,
        report.errors
    );
    Ok(report)
}

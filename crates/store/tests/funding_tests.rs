use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::tempdir;
use tic_core::common::Page;
use tic_core::funding::entity::{
    Deposit, DepositFilter, DepositStatus, PaymentMethod, ReviewAction, ReviewDecision,
    Withdrawal, WithdrawalStatus,
};
use tic_core::funding::error::FundingError;
use tic_core::funding::port::FundingStore;
use tic_core::notify::port::NotificationStore;
use tic_core::wallet::entity::{BalanceChange, Posting, TransactionKind, WalletAccount};
use tic_core::wallet::error::WalletError;
use tic_core::wallet::port::WalletStore;
use tic_store::{Database, SqliteFundingStore, SqliteNotificationStore, SqliteWalletStore};

struct Fixture {
    _tmp: tempfile::TempDir,
    funding: SqliteFundingStore,
    wallets: SqliteWalletStore,
    inbox: SqliteNotificationStore,
    method: PaymentMethod,
}

async fn fixture() -> anyhow::Result<Fixture> {
    let tmp = tempdir()?;
    let db = Database::open_at(tmp.path()).await?;
    let funding = SqliteFundingStore::new(db.clone());
    let method = PaymentMethod {
        id: "usdt-trc20".into(),
        name: "USDT (TRC20)".into(),
        network: "TRC20".into(),
        currency: "USD".into(),
        deposit_address: Some("TXYZdeposit".into()),
        min_amount: dec!(10),
        max_amount: dec!(10000),
        processing_fee_rate: dec!(0.01),
        fixed_fee: dec!(1),
        network_fee: dec!(0.5),
        is_active: true,
    };
    funding.save_payment_method(&method).await?;
    Ok(Fixture {
        _tmp: tmp,
        funding,
        wallets: SqliteWalletStore::new(db.clone()),
        inbox: SqliteNotificationStore::new(db),
        method,
    })
}

fn decision(action: ReviewAction) -> ReviewDecision {
    ReviewDecision {
        action,
        admin_email: "admin@ticgloballtd.com".into(),
        notes: Some("checked".into()),
        transaction_hash: None,
    }
}

async fn total(wallets: &SqliteWalletStore, email: &str) -> anyhow::Result<Decimal> {
    Ok(wallets
        .get_wallet(email)
        .await?
        .map(|w| w.total_balance)
        .unwrap_or_default())
}

#[tokio::test]
async fn test_deposit_approval_credits_exactly_once() -> anyhow::Result<()> {
    let f = fixture().await?;
    let now = Utc::now();
    let deposit = Deposit::new_pending("dep-1".into(), "user@example.com".into(), dec!(100), &f.method, now)?;
    f.funding.create_deposit(&deposit).await?;

    // 1. Approve: status, audit fields, wallet and ledger move together
    let approved = f
        .funding
        .review_deposit("dep-1", &decision(ReviewAction::Approve), now)
        .await?;
    assert_eq!(approved.status, DepositStatus::Approved);
    assert_eq!(approved.approved_by.as_deref(), Some("admin@ticgloballtd.com"));
    assert_eq!(total(&f.wallets, "user@example.com").await?, dec!(97.50));

    let ledger = f.wallets.list_transactions("user@example.com", 10).await?;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].transaction_id, "deposit_dep-1");
    assert_eq!(ledger[0].kind, TransactionKind::Deposit);
    assert_eq!(ledger[0].amount, dec!(97.50));

    // 2. A second approval is a conflict and does not credit again
    let err = f
        .funding
        .review_deposit("dep-1", &decision(ReviewAction::Approve), now)
        .await
        .unwrap_err();
    assert!(matches!(err, FundingError::InvalidState { .. }));

    // 3. Moving to completed keeps the single credit
    let update = f
        .funding
        .set_deposit_status("dep-1", DepositStatus::Completed, "admin@ticgloballtd.com", None, Some("0xabc".into()), now)
        .await?;
    assert!(!update.credited);
    assert_eq!(update.deposit.status, DepositStatus::Completed);
    assert_eq!(total(&f.wallets, "user@example.com").await?, dec!(97.50));

    // 4. The owner got an inbox entry
    assert_eq!(f.inbox.count_notifications("user@example.com", true).await?, 1);

    // 5. Credited deposits cannot be deleted or moved back
    assert!(matches!(
        f.funding.delete_deposit("dep-1").await,
        Err(FundingError::InvalidState { .. })
    ));
    assert!(matches!(
        f.funding
            .set_deposit_status("dep-1", DepositStatus::Pending, "admin@ticgloballtd.com", None, None, now)
            .await,
        Err(FundingError::InvalidState { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_deposit_rejection_and_unknown_id() -> anyhow::Result<()> {
    let f = fixture().await?;
    let now = Utc::now();
    let deposit = Deposit::new_pending("dep-2".into(), "user@example.com".into(), dec!(50), &f.method, now)?;
    f.funding.create_deposit(&deposit).await?;

    let rejected = f
        .funding
        .review_deposit("dep-2", &decision(ReviewAction::Reject), now)
        .await?;
    assert_eq!(rejected.status, DepositStatus::Rejected);
    assert_eq!(rejected.admin_notes.as_deref(), Some("checked"));
    assert_eq!(total(&f.wallets, "user@example.com").await?, dec!(0));

    assert!(matches!(
        f.funding
            .review_deposit("missing", &decision(ReviewAction::Approve), now)
            .await,
        Err(FundingError::NotFound(_))
    ));

    // Rejected deposits never moved money and may be deleted
    let deleted = f.funding.delete_deposit("dep-2").await?;
    assert_eq!(deleted.id, "dep-2");
    assert!(f.funding.get_deposit("dep-2").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_completed_override_credits_pending_deposit() -> anyhow::Result<()> {
    let f = fixture().await?;
    let now = Utc::now();
    let deposit = Deposit::new_pending("dep-3".into(), "user@example.com".into(), dec!(200), &f.method, now)?;
    f.funding.create_deposit(&deposit).await?;

    let update = f
        .funding
        .set_deposit_status("dep-3", DepositStatus::Completed, "admin@ticgloballtd.com", None, None, now)
        .await?;
    assert!(update.credited);
    // 200 - (200 * 1% + 1) - 0.5
    assert_eq!(total(&f.wallets, "user@example.com").await?, dec!(196.50));

    assert!(matches!(
        f.funding
            .set_deposit_status("dep-3", DepositStatus::Expired, "admin@ticgloballtd.com", None, None, now)
            .await,
        Err(FundingError::Validation(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_deposit_listing_filters_and_stats() -> anyhow::Result<()> {
    let f = fixture().await?;
    let now = Utc::now();
    for (i, email) in ["a@example.com", "b@example.com", "a@example.com"].iter().enumerate() {
        let created = now - Duration::hours(i64::try_from(i)? * 30);
        let dep = Deposit::new_pending(format!("dep-{}", i), (*email).into(), dec!(100), &f.method, created)?;
        f.funding.create_deposit(&dep).await?;
    }
    f.funding
        .review_deposit("dep-0", &decision(ReviewAction::Approve), now)
        .await?;

    let filter = DepositFilter {
        user_email: Some("A@EXAMPLE".into()),
        page: Page::new(Some(1), None, 50),
        ..Default::default()
    };
    let (page, has_more) = f.funding.list_deposits(&filter).await?;
    assert_eq!(page.len(), 1);
    assert!(has_more);
    assert_eq!(page[0].id, "dep-0");

    let pending_only = DepositFilter {
        status: Some(DepositStatus::Pending),
        ..Default::default()
    };
    let (pending, has_more) = f.funding.list_deposits(&pending_only).await?;
    assert_eq!(pending.len(), 2);
    assert!(!has_more);

    let stats = f.funding.deposit_stats(now - Duration::hours(1)).await?;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.approved, 1);
    assert_eq!(stats.pending_amount, dec!(200));
    assert_eq!(stats.total_amount, dec!(97.50));
    assert_eq!(stats.deposits_today, 1);
    Ok(())
}

#[tokio::test]
async fn test_withdrawal_hold_reject_and_cancel_refund() -> anyhow::Result<()> {
    let f = fixture().await?;
    let now = Utc::now();
    f.wallets
        .post(&[Posting::new("user@example.com", "seed", TransactionKind::Adjustment, "seed")
            .with_change(BalanceChange::credit(WalletAccount::Total, dec!(300)))])
        .await?;

    // 1. Creation holds the amount
    let w1 = Withdrawal::new_pending("wd-1".into(), "user@example.com".into(), "TDEST".into(), dec!(100), &f.method, now)?;
    f.funding.create_withdrawal(&w1).await?;
    assert_eq!(total(&f.wallets, "user@example.com").await?, dec!(200));

    // 2. Rejection refunds the hold
    let rejected = f
        .funding
        .review_withdrawal("wd-1", &decision(ReviewAction::Reject), now)
        .await?;
    assert_eq!(rejected.status, WithdrawalStatus::Rejected);
    assert_eq!(total(&f.wallets, "user@example.com").await?, dec!(300));

    // 3. Reviewing again is a conflict
    assert!(matches!(
        f.funding
            .review_withdrawal("wd-1", &decision(ReviewAction::Approve), now)
            .await,
        Err(FundingError::InvalidState { .. })
    ));

    // 4. Owner cancellation refunds; other users only see NotFound
    let w2 = Withdrawal::new_pending("wd-2".into(), "user@example.com".into(), "TDEST".into(), dec!(50), &f.method, now)?;
    f.funding.create_withdrawal(&w2).await?;
    assert!(matches!(
        f.funding.cancel_withdrawal("wd-2", "intruder@example.com", now).await,
        Err(FundingError::NotFound(_))
    ));
    let cancelled = f.funding.cancel_withdrawal("wd-2", "user@example.com", now).await?;
    assert_eq!(cancelled.status, WithdrawalStatus::Cancelled);
    assert_eq!(total(&f.wallets, "user@example.com").await?, dec!(300));

    // 5. Approval keeps the hold
    let w3 = Withdrawal::new_pending("wd-3".into(), "user@example.com".into(), "TDEST".into(), dec!(120), &f.method, now)?;
    f.funding.create_withdrawal(&w3).await?;
    let mut approve = decision(ReviewAction::Approve);
    approve.transaction_hash = Some("0xpaid".into());
    let approved = f.funding.review_withdrawal("wd-3", &approve, now).await?;
    assert_eq!(approved.transaction_hash.as_deref(), Some("0xpaid"));
    assert_eq!(total(&f.wallets, "user@example.com").await?, dec!(180));

    let stats = f.funding.withdrawal_stats("user@example.com").await?;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.total_withdrawn, dec!(120));
    Ok(())
}

#[tokio::test]
async fn test_withdrawal_completion_only_follows_approval() -> anyhow::Result<()> {
    let f = fixture().await?;
    let now = Utc::now();
    f.wallets
        .post(&[Posting::new("user@example.com", "seed", TransactionKind::Adjustment, "seed")
            .with_change(BalanceChange::credit(WalletAccount::Total, dec!(200)))])
        .await?;
    let w = Withdrawal::new_pending("wd-c".into(), "user@example.com".into(), "TDEST".into(), dec!(100), &f.method, now)?;
    f.funding.create_withdrawal(&w).await?;

    // 1. Pending requests cannot be completed
    assert!(matches!(
        f.funding.complete_withdrawal("wd-c", "admin@ticgloballtd.com", None, now).await,
        Err(FundingError::InvalidState { .. })
    ));

    // 2. Approved -> completed, no further money movement
    f.funding
        .review_withdrawal("wd-c", &decision(ReviewAction::Approve), now)
        .await?;
    let completed = f
        .funding
        .complete_withdrawal("wd-c", "admin@ticgloballtd.com", Some("0xsent".into()), now)
        .await?;
    assert_eq!(completed.status, WithdrawalStatus::Completed);
    assert_eq!(completed.transaction_hash.as_deref(), Some("0xsent"));
    assert_eq!(completed.processed_by.as_deref(), Some("admin@ticgloballtd.com"));
    assert_eq!(total(&f.wallets, "user@example.com").await?, dec!(100));

    // 3. Completion is final
    assert!(matches!(
        f.funding.complete_withdrawal("wd-c", "admin@ticgloballtd.com", None, now).await,
        Err(FundingError::InvalidState { .. })
    ));
    assert!(matches!(
        f.funding.complete_withdrawal("missing", "admin@ticgloballtd.com", None, now).await,
        Err(FundingError::NotFound(_))
    ));

    let stats = f.funding.withdrawal_stats("user@example.com").await?;
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.total_withdrawn, dec!(100));
    Ok(())
}

#[tokio::test]
async fn test_withdrawal_over_balance_is_not_recorded() -> anyhow::Result<()> {
    let f = fixture().await?;
    let now = Utc::now();
    let w = Withdrawal::new_pending("wd-x".into(), "poor@example.com".into(), "TDEST".into(), dec!(100), &f.method, now)?;

    let err = f.funding.create_withdrawal(&w).await.unwrap_err();
    assert!(matches!(
        err,
        FundingError::Wallet(WalletError::InsufficientBalance { .. })
    ));
    assert!(f.funding.get_withdrawal("wd-x").await?.is_none());
    Ok(())
}

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::tempdir;
use tic_core::commission::entity::{CommissionFilter, CommissionKind};
use tic_core::commission::port::CommissionStore;
use tic_core::commission::service::run_unilevel_distribution;
use tic_core::common::Page;
use tic_core::distribution::port::DistributionStore;
use tic_core::distribution::service::run_daily_distribution;
use tic_core::notify::port::NotificationStore;
use tic_core::plan::error::PlanError;
use tic_core::plan::port::PlanStore;
use tic_core::referral::entity::{Referral, ReferralCode};
use tic_core::referral::port::ReferralStore;
use tic_core::wallet::entity::{BalanceChange, Posting, TransactionKind, WalletAccount};
use tic_core::wallet::error::WalletError;
use tic_core::wallet::port::WalletStore;
use tic_store::{
    Database, SqliteCommissionStore, SqliteDistributionStore, SqliteNotificationStore,
    SqlitePlanStore, SqliteReferralStore, SqliteWalletStore,
};

struct Fixture {
    _tmp: tempfile::TempDir,
    plans: SqlitePlanStore,
    commissions: SqliteCommissionStore,
    referrals: SqliteReferralStore,
    distribution: SqliteDistributionStore,
    wallets: SqliteWalletStore,
    inbox: SqliteNotificationStore,
}

async fn fixture() -> anyhow::Result<Fixture> {
    let tmp = tempdir()?;
    let db = Database::open_at(tmp.path()).await?;
    Ok(Fixture {
        _tmp: tmp,
        plans: SqlitePlanStore::new(db.clone()),
        commissions: SqliteCommissionStore::new(db.clone()),
        referrals: SqliteReferralStore::new(db.clone()),
        distribution: SqliteDistributionStore::new(db.clone()),
        wallets: SqliteWalletStore::new(db.clone()),
        inbox: SqliteNotificationStore::new(db),
    })
}

impl Fixture {
    async fn fund(&self, email: &str, amount: Decimal) -> anyhow::Result<()> {
        self.wallets
            .post(&[Posting::new(email, format!("seed_{}", email), TransactionKind::Adjustment, "seed")
                .with_change(BalanceChange::credit(WalletAccount::Total, amount))])
            .await?;
        Ok(())
    }

    /// `referrer` gets a code (if needed) and `referred` is linked under it.
    async fn link(&self, referrer: &str, referred: &str) -> anyhow::Result<()> {
        let code = match self.referrals.get_code_for_user(referrer).await? {
            Some(code) => code,
            None => {
                let code = ReferralCode {
                    code: referrer[..3].to_uppercase() + "0001",
                    user_email: referrer.into(),
                    link: String::new(),
                    total_referrals: 0,
                    total_earnings: Decimal::ZERO,
                    created_at: Utc::now(),
                };
                self.referrals.insert_code(&code).await?;
                code
            }
        };
        self.referrals
            .record_referral(&Referral {
                referrer_email: referrer.into(),
                referred_email: referred.into(),
                referral_code: code.code,
                created_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    async fn partner(&self, email: &str) -> anyhow::Result<Decimal> {
        Ok(self
            .wallets
            .get_wallet(email)
            .await?
            .map(|w| w.partner_wallet_balance)
            .unwrap_or_default())
    }
}

#[tokio::test]
async fn test_catalogue_is_seeded() -> anyhow::Result<()> {
    let f = fixture().await?;
    let plans = f.plans.list_plans(true).await?;
    let ids: Vec<&str> = plans.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["starter", "vip"]);
    assert_eq!(plans[0].price, dec!(10));
    assert_eq!(plans[1].price, dec!(138));
    assert_eq!(plans[1].duration_days, 365);
    assert!(f.plans.get_plan("gold").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_vip_purchase_pays_two_upline_levels() -> anyhow::Result<()> {
    let f = fixture().await?;
    let now = Utc::now();
    // top -> mid -> low -> buyer
    f.link("top@example.com", "mid@example.com").await?;
    f.link("mid@example.com", "low@example.com").await?;
    f.link("low@example.com", "buyer@example.com").await?;

    // 1. Not enough money: nothing is recorded
    f.fund("buyer@example.com", dec!(100)).await?;
    let err = f.plans.purchase("buyer@example.com", "vip", now).await.unwrap_err();
    assert!(matches!(
        err,
        PlanError::Wallet(WalletError::InsufficientBalance { .. })
    ));
    assert!(f.distribution.list_user_subscriptions("buyer@example.com").await?.is_empty());
    assert_eq!(f.partner("low@example.com").await?, Decimal::ZERO);

    // 2. Funded purchase debits, subscribes and pays levels 1 and 2 only
    f.fund("buyer@example.com", dec!(100)).await?;
    let purchase = f.plans.purchase("buyer@example.com", "vip", now).await?;
    assert_eq!(purchase.payment.balance_before, dec!(200));
    assert_eq!(purchase.payment.balance_after, dec!(62));
    assert_eq!(purchase.wallet.total_balance, dec!(62));
    assert_eq!(purchase.subscription.end_date, now + Duration::days(365));
    assert_eq!(purchase.commissions.len(), 2);

    assert_eq!(f.partner("low@example.com").await?, dec!(0.044));
    assert_eq!(f.partner("mid@example.com").await?, dec!(0.022));
    assert_eq!(f.partner("top@example.com").await?, Decimal::ZERO);
    let low_code = f.referrals.get_code_for_user("low@example.com").await?.expect("code");
    assert_eq!(low_code.total_earnings, dec!(0.044));

    let ledger = f.wallets.list_transactions("buyer@example.com", 10).await?;
    assert_eq!(ledger[0].kind, TransactionKind::PlanPurchase);
    assert_eq!(ledger[0].amount, dec!(-138));

    // 3. Payment history and buyer inbox
    let (payments, has_more) = f.plans.list_payments("buyer@example.com", Page::new(None, None, 10)).await?;
    assert_eq!(payments.len(), 1);
    assert!(!has_more);
    assert_eq!(payments[0].subscription_id, purchase.subscription.id);
    let stats = f.plans.payment_stats("buyer@example.com").await?;
    assert_eq!(stats.total_spent, dec!(138));
    assert_eq!(f.inbox.count_notifications("buyer@example.com", true).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_starter_purchase_pays_no_commission() -> anyhow::Result<()> {
    let f = fixture().await?;
    f.link("top@example.com", "buyer@example.com").await?;
    f.fund("buyer@example.com", dec!(10)).await?;

    let purchase = f.plans.purchase("buyer@example.com", "starter", Utc::now()).await?;
    assert!(purchase.commissions.is_empty());
    assert_eq!(purchase.wallet.total_balance, Decimal::ZERO);
    assert_eq!(f.partner("top@example.com").await?, Decimal::ZERO);

    assert!(matches!(
        f.plans.purchase("buyer@example.com", "gold", Utc::now()).await,
        Err(PlanError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn test_daily_unilevel_run_credits_partner_wallets_once() -> anyhow::Result<()> {
    let f = fixture().await?;
    let now = Utc::now();
    // root (VIP) -> a (VIP) -> b (2x VIP) ; plain -> c (VIP) -> d (VIP)
    f.link("root@example.com", "a@example.com").await?;
    f.link("a@example.com", "b@example.com").await?;
    f.link("plain@example.com", "c@example.com").await?;
    f.link("c@example.com", "d@example.com").await?;
    for (email, plans) in [("root@example.com", 1), ("a@example.com", 1), ("b@example.com", 2), ("c@example.com", 1), ("d@example.com", 1)] {
        f.fund(email, dec!(138) * Decimal::from(plans)).await?;
        for _ in 0..plans {
            f.plans.purchase(email, "vip", now).await?;
        }
    }

    let network = f.commissions.downline("root@example.com", 15).await?;
    let levels: Vec<(&str, u32)> = network.iter().map(|m| (m.email.as_str(), m.level)).collect();
    assert_eq!(levels, vec![("a@example.com", 1), ("b@example.com", 2)]);
    assert_eq!(f.commissions.downline("plain@example.com", 1).await?.len(), 1);

    let before_root = f.partner("root@example.com").await?;
    let before_plain = f.partner("plain@example.com").await?;

    let report = run_unilevel_distribution(&f.commissions, now).await?;
    assert_eq!(report.errors, 0);
    // root: a (L1, 1 plan) + b (L2, 2 plans)
    assert_eq!(f.partner("root@example.com").await? - before_root, dec!(0.044) + dec!(0.044));
    // plain holds no VIP plan: level 1 only
    assert_eq!(f.partner("plain@example.com").await? - before_plain, dec!(0.044));

    let again = run_unilevel_distribution(&f.commissions, now).await?;
    assert_eq!(again.credited, 0);
    assert_eq!(again.skipped, report.credited);

    let stored = f.commissions.day_report(now.date_naive()).await?;
    assert_eq!(stored.credited, report.credited);
    assert_eq!(stored.total_amount, report.total_amount);

    // History and summary of one earner
    let filter = CommissionFilter {
        kind: Some(CommissionKind::UnilevelDaily),
        ..Default::default()
    };
    let (daily, has_more) = f
        .commissions
        .list_commissions("root@example.com", &filter, Page::new(Some(1), None, 10))
        .await?;
    assert_eq!(daily.len(), 1);
    assert!(has_more);
    let summary = f.commissions.summary("root@example.com").await?;
    assert_eq!(summary.daily_earned, dec!(0.088));
    assert_eq!(summary.total_earned, summary.daily_earned + summary.purchase_earned);
    assert_eq!(summary.total_earned, f.partner("root@example.com").await?);

    let by_member = f.commissions.earnings_by_member("root@example.com").await?;
    assert_eq!(by_member.get("b@example.com").copied(), Some(dec!(0.044) + dec!(0.022) * Decimal::TWO));
    Ok(())
}

#[tokio::test]
async fn test_user_distribution_history() -> anyhow::Result<()> {
    let f = fixture().await?;
    let now = Utc::now();
    f.fund("vip@example.com", dec!(148)).await?;
    f.plans.purchase("vip@example.com", "vip", now).await?;
    f.plans.purchase("vip@example.com", "starter", now).await?;

    run_daily_distribution(&f.distribution, now).await?;

    let (all, has_more) = f
        .distribution
        .list_user_distributions("vip@example.com", None, Page::new(None, None, 20))
        .await?;
    assert_eq!(all.len(), 2);
    assert!(!has_more);

    let (vip_only, _) = f
        .distribution
        .list_user_distributions("vip@example.com", Some("vip"), Page::new(None, None, 20))
        .await?;
    assert_eq!(vip_only.len(), 1);
    assert_eq!(vip_only[0].plan_name, "VIP Plan");
    assert_eq!(vip_only[0].token_amount, dec!(18.90410959));

    let totals = f.distribution.user_distribution_totals("vip@example.com", None).await?;
    assert_eq!(totals.count, 2);
    assert_eq!(totals.total_tokens, dec!(18.90410959) + dec!(1.36986301));
    assert!(f.distribution.list_user_distributions("nobody@example.com", None, Page::default()).await?.0.is_empty());
    Ok(())
}

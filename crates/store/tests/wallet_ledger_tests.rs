use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::tempdir;
use tic_core::wallet::entity::{BalanceChange, Posting, TransactionKind, WalletAccount};
use tic_core::wallet::error::WalletError;
use tic_core::wallet::port::WalletStore;
use tic_store::{Database, SqliteWalletStore};

fn credit(email: &str, tx_id: &str, account: WalletAccount, amount: rust_decimal::Decimal) -> Posting {
    Posting::new(email, tx_id, TransactionKind::Adjustment, "test credit")
        .with_change(BalanceChange::credit(account, amount))
}

#[tokio::test]
async fn test_post_writes_balance_and_ledger_together() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let store = SqliteWalletStore::new(Database::open_at(tmp.path()).await?);

    // 1. A fresh wallet is created on demand with zero balances
    let wallet = store.get_or_create_wallet("alice@example.com").await?;
    assert_eq!(wallet.total_balance, dec!(0));

    // 2. A posting credits the slot and records one ledger row
    let outcome = store
        .post(&[credit("alice@example.com", "tx_1", WalletAccount::Total, dec!(125.50))])
        .await?;
    assert!(outcome.applied);
    assert_eq!(outcome.wallets[0].total_balance, dec!(125.50));
    assert_eq!(outcome.transactions.len(), 1);
    assert_eq!(outcome.transactions[0].balance_before, dec!(0));
    assert_eq!(outcome.transactions[0].balance_after, dec!(125.50));

    // 3. Replaying the same transaction id changes nothing
    let replay = store
        .post(&[credit("alice@example.com", "tx_1", WalletAccount::Total, dec!(125.50))])
        .await?;
    assert!(!replay.applied);
    let wallet = store.get_wallet("alice@example.com").await?.expect("wallet exists");
    assert_eq!(wallet.total_balance, dec!(125.50));

    let history = store.list_transactions("alice@example.com", 10).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, TransactionKind::Adjustment);
    Ok(())
}

#[tokio::test]
async fn test_overdraft_rolls_back_whole_batch() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let store = SqliteWalletStore::new(Database::open_at(tmp.path()).await?);

    store
        .post(&[credit("bob@example.com", "seed", WalletAccount::Total, dec!(50))])
        .await?;

    // Transfer out 80 while only 50 is available: the recipient leg must not land
    let transfer = [
        Posting::new("bob@example.com", "tx_transfer", TransactionKind::TransferOut, "to carol")
            .with_change(BalanceChange::debit(WalletAccount::Total, dec!(80))),
        Posting::new("carol@example.com", "tx_transfer", TransactionKind::TransferIn, "from bob")
            .with_change(BalanceChange::credit(WalletAccount::Total, dec!(80))),
    ];
    let err = store.post(&transfer).await.unwrap_err();
    match err {
        WalletError::InsufficientBalance {
            account,
            required,
            available,
        } => {
            assert_eq!(account, WalletAccount::Total);
            assert_eq!(required, dec!(80));
            assert_eq!(available, dec!(50));
        }
        other => panic!("unexpected error: {other}"),
    }

    let bob = store.get_wallet("bob@example.com").await?.expect("bob wallet");
    assert_eq!(bob.total_balance, dec!(50));
    assert!(store.get_wallet("carol@example.com").await?.is_none());
    assert_eq!(store.list_transactions("bob@example.com", 10).await?.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_lose_updates() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let store = Arc::new(SqliteWalletStore::new(Database::open_at(tmp.path()).await?));

    store
        .post(&[credit("dave@example.com", "seed", WalletAccount::Total, dec!(300))])
        .await?;

    // 50 debits of 10 against 300: exactly 30 succeed
    let mut handles = Vec::new();
    for i in 0..50 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let posting = Posting::new(
                "dave@example.com",
                format!("debit_{}", i),
                TransactionKind::Withdrawal,
                "concurrent debit",
            )
            .with_change(BalanceChange::debit(WalletAccount::Total, dec!(10)));
            store.post(&[posting]).await
        }));
    }

    let mut ok = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await? {
            Ok(outcome) => {
                assert!(outcome.applied);
                ok += 1;
            }
            Err(WalletError::InsufficientBalance { .. }) => insufficient += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(ok, 30);
    assert_eq!(insufficient, 20);
    let wallet = store.get_wallet("dave@example.com").await?.expect("wallet exists");
    assert_eq!(wallet.total_balance, dec!(0));
    assert_eq!(store.list_transactions("dave@example.com", 100).await?.len(), 31);
    Ok(())
}

#[tokio::test]
async fn test_internal_transfer_shares_one_transaction_id() -> anyhow::Result<()> {
    let tmp = tempdir()?;
    let store = SqliteWalletStore::new(Database::open_at(tmp.path()).await?);
    store
        .post(&[credit("erin@example.com", "seed", WalletAccount::Total, dec!(100))])
        .await?;

    // total -> tic at 0.02 USD per token
    let plan = tic_core::wallet::transfer::plan_internal_transfer(
        WalletAccount::Total,
        WalletAccount::Tic,
        dec!(10),
    )?;
    let posting = Posting::new("erin@example.com", "tx_int", TransactionKind::InternalTransfer, "total to tic")
        .with_change(plan.debit)
        .with_change(plan.credit);
    let outcome = store.post(&[posting]).await?;

    assert_eq!(outcome.transactions.len(), 2);
    assert!(outcome.transactions.iter().all(|t| t.transaction_id == "tx_int"));
    assert_eq!(outcome.wallets[0].total_balance, dec!(90));
    assert_eq!(outcome.wallets[0].tic_balance, dec!(500));
    Ok(())
}

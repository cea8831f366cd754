use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// # Summary
/// Balance slot inside a wallet.
///
/// # Invariants
/// - `Tic` and `Gic` hold token units; every other slot holds USD.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WalletAccount {
    Total,
    Tic,
    Gic,
    Staking,
    #[serde(rename = "partner_wallet")]
    Partner,
}

impl WalletAccount {
    pub const ALL: [WalletAccount; 5] = [
        WalletAccount::Total,
        WalletAccount::Tic,
        WalletAccount::Gic,
        WalletAccount::Staking,
        WalletAccount::Partner,
    ];

    /// Column holding this slot in the `wallets` table.
    pub fn column(&self) -> &'static str {
        match self {
            WalletAccount::Total => "total_balance",
            WalletAccount::Tic => "tic_balance",
            WalletAccount::Gic => "gic_balance",
            WalletAccount::Staking => "staking_balance",
            WalletAccount::Partner => "partner_wallet_balance",
        }
    }

    pub fn is_token(&self) -> bool {
        matches!(self, WalletAccount::Tic | WalletAccount::Gic)
    }
}

impl fmt::Display for WalletAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WalletAccount::Total => "total",
            WalletAccount::Tic => "tic",
            WalletAccount::Gic => "gic",
            WalletAccount::Staking => "staking",
            WalletAccount::Partner => "partner_wallet",
        };
        f.write_str(s)
    }
}

impl FromStr for WalletAccount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total" => Ok(WalletAccount::Total),
            "tic" => Ok(WalletAccount::Tic),
            "gic" => Ok(WalletAccount::Gic),
            "staking" => Ok(WalletAccount::Staking),
            "partner_wallet" | "partner" => Ok(WalletAccount::Partner),
            _ => Err(format!("Unknown wallet account: {}", s)),
        }
    }
}

/// # Summary
/// Per-user segmented balances.
///
/// # Invariants
/// - Exactly one wallet per `user_email`.
/// - No slot is ever negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    pub user_email: String,
    pub total_balance: Decimal,
    pub tic_balance: Decimal,
    pub gic_balance: Decimal,
    pub staking_balance: Decimal,
    pub partner_wallet_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn empty(user_email: String, now: DateTime<Utc>) -> Self {
        Self {
            user_email,
            total_balance: Decimal::ZERO,
            tic_balance: Decimal::ZERO,
            gic_balance: Decimal::ZERO,
            staking_balance: Decimal::ZERO,
            partner_wallet_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn balance(&self, account: WalletAccount) -> Decimal {
        match account {
            WalletAccount::Total => self.total_balance,
            WalletAccount::Tic => self.tic_balance,
            WalletAccount::Gic => self.gic_balance,
            WalletAccount::Staking => self.staking_balance,
            WalletAccount::Partner => self.partner_wallet_balance,
        }
    }

    pub fn balance_mut(&mut self, account: WalletAccount) -> &mut Decimal {
        match account {
            WalletAccount::Total => &mut self.total_balance,
            WalletAccount::Tic => &mut self.tic_balance,
            WalletAccount::Gic => &mut self.gic_balance,
            WalletAccount::Staking => &mut self.staking_balance,
            WalletAccount::Partner => &mut self.partner_wallet_balance,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Refund,
    TransferIn,
    TransferOut,
    InternalTransfer,
    Adjustment,
    Distribution,
    PlanPurchase,
    Commission,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Refund => "refund",
            TransactionKind::TransferIn => "transfer_in",
            TransactionKind::TransferOut => "transfer_out",
            TransactionKind::InternalTransfer => "internal_transfer",
            TransactionKind::Adjustment => "adjustment",
            TransactionKind::Distribution => "distribution",
            TransactionKind::PlanPurchase => "plan_purchase",
            TransactionKind::Commission => "commission",
        };
        f.write_str(s)
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            "refund" => Ok(TransactionKind::Refund),
            "transfer_in" => Ok(TransactionKind::TransferIn),
            "transfer_out" => Ok(TransactionKind::TransferOut),
            "internal_transfer" => Ok(TransactionKind::InternalTransfer),
            "adjustment" => Ok(TransactionKind::Adjustment),
            "distribution" => Ok(TransactionKind::Distribution),
            "plan_purchase" => Ok(TransactionKind::PlanPurchase),
            "commission" => Ok(TransactionKind::Commission),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

/// # Summary
/// One append-only ledger row: a signed movement on a single slot.
///
/// # Invariants
/// - `balance_after == balance_before + amount`.
/// - Written in the same database transaction as the balance change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    /// Groups the rows of one logical operation (both legs of a transfer share it).
    pub transaction_id: String,
    pub user_email: String,
    pub kind: TransactionKind,
    pub account: WalletAccount,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub description: String,
    pub reference_id: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Signed delta on one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub account: WalletAccount,
    pub delta: Decimal,
}

impl BalanceChange {
    pub fn credit(account: WalletAccount, amount: Decimal) -> Self {
        Self { account, delta: amount }
    }

    pub fn debit(account: WalletAccount, amount: Decimal) -> Self {
        Self { account, delta: -amount }
    }
}

/// # Summary
/// A set of balance changes on one wallet plus the ledger context they are
/// recorded under.
///
/// # Invariants
/// - `(transaction_id, user_email)` identifies the posting; a second
///   posting with the same pair is a no-op.
#[derive(Debug, Clone)]
pub struct Posting {
    pub user_email: String,
    pub transaction_id: String,
    pub kind: TransactionKind,
    pub description: String,
    pub reference_id: Option<String>,
    pub metadata: serde_json::Value,
    pub changes: Vec<BalanceChange>,
}

impl Posting {
    pub fn new(
        user_email: impl Into<String>,
        transaction_id: impl Into<String>,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_email: user_email.into(),
            transaction_id: transaction_id.into(),
            kind,
            description: description.into(),
            reference_id: None,
            metadata: serde_json::Value::Null,
            changes: Vec::new(),
        }
    }

    pub fn with_change(mut self, change: BalanceChange) -> Self {
        self.changes.push(change);
        self
    }

    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Result of posting a batch.
#[derive(Debug, Clone)]
pub struct PostOutcome {
    /// `false` when the batch had already been recorded and nothing changed.
    pub applied: bool,
    /// Wallet state after the batch, in posting order.
    pub wallets: Vec<Wallet>,
    pub transactions: Vec<WalletTransaction>,
}

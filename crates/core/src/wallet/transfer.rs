//! Planning of wallet movements before they are posted.

use super::entity::{BalanceChange, Wallet, WalletAccount};
use super::error::WalletError;
use super::pricing::{TokenRounding, usd_to_gic, usd_to_tic};
use rust_decimal::Decimal;

/// Debit and credit legs of a move between two slots of the same wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalTransferPlan {
    pub usd_amount: Decimal,
    pub debit: BalanceChange,
    pub credit: BalanceChange,
}

/// Converts a USD amount into the unit held by `account`; token slots are
/// rounded in the direction of the leg.
pub fn usd_to_account_units(account: WalletAccount, usd: Decimal, rounding: TokenRounding) -> Decimal {
    match account {
        WalletAccount::Tic => usd_to_tic(usd, rounding),
        WalletAccount::Gic => usd_to_gic(usd, rounding),
        _ => usd,
    }
}

/// # Summary
/// Validates and prices a transfer between two slots of one wallet.
///
/// # Logic
/// 1. `amount` (USD) must be positive and the slots must differ.
/// 2. Sub-accounts only pay out to `total`; `total` may fund any slot.
/// 3. Token legs are converted at the fixed prices: the credited side rounds
///    down and the debited side rounds up.
///
/// # Returns
/// * The two legs; the caller posts them together.
pub fn plan_internal_transfer(
    from: WalletAccount,
    to: WalletAccount,
    usd_amount: Decimal,
) -> Result<InternalTransferPlan, WalletError> {
    if usd_amount <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(
            "Transfer amount must be greater than 0".into(),
        ));
    }
    if from == to {
        return Err(WalletError::InvalidTransfer(
            "Cannot transfer to the same account".into(),
        ));
    }
    if from != WalletAccount::Total && to != WalletAccount::Total {
        return Err(WalletError::InvalidTransfer(format!(
            "{} can only transfer to the main wallet",
            from
        )));
    }

    let debit_units = usd_to_account_units(from, usd_amount, TokenRounding::Debit);
    let credit_units = usd_to_account_units(to, usd_amount, TokenRounding::Credit);
    if debit_units.is_zero() || credit_units.is_zero() {
        return Err(WalletError::InvalidAmount("Transfer amount is too small".into()));
    }

    Ok(InternalTransferPlan {
        usd_amount,
        debit: BalanceChange::debit(from, debit_units),
        credit: BalanceChange::credit(to, credit_units),
    })
}

/// # Summary
/// Turns an admin balance adjustment into balance changes.
///
/// # Logic
/// Zero deltas are dropped; a delta that would leave a slot negative is
/// rejected with `InsufficientBalance` before anything is written.
pub fn plan_adjustment(
    wallet: &Wallet,
    updates: &[(WalletAccount, Decimal)],
) -> Result<Vec<BalanceChange>, WalletError> {
    let mut changes = Vec::new();
    for &(account, delta) in updates {
        if delta.is_zero() {
            continue;
        }
        let available = wallet.balance(account);
        if available + delta < Decimal::ZERO {
            return Err(WalletError::InsufficientBalance {
                account,
                required: -delta,
                available,
            });
        }
        changes.push(BalanceChange { account, delta });
    }
    if changes.is_empty() {
        return Err(WalletError::InvalidAmount("No balance updates given".into()));
    }
    Ok(changes)
}

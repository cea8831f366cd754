//! Fixed token prices and plan allocations.

use rust_decimal::{Decimal, RoundingStrategy};

/// USD per TIC token (0.02).
pub const TIC_PRICE_USD: Decimal = Decimal::from_parts(2, 0, 0, false, 2);
/// USD per GIC token (63.00).
pub const GIC_PRICE_USD: Decimal = Decimal::from_parts(63, 0, 0, false, 0);

/// Decimal places kept on token amounts.
pub const TOKEN_SCALE: u32 = 8;

const DAYS_PER_YEAR: Decimal = Decimal::from_parts(365, 0, 0, false, 0);

/// Direction in which a converted token amount is cut to [`TOKEN_SCALE`].
///
/// Credited tokens round down and debited tokens round up, so a USD amount
/// converted in and back out can only lose dust, never gain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRounding {
    Credit,
    Debit,
}

impl TokenRounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            TokenRounding::Credit => RoundingStrategy::ToZero,
            TokenRounding::Debit => RoundingStrategy::AwayFromZero,
        }
    }
}

fn round_tokens(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(TOKEN_SCALE, RoundingStrategy::MidpointNearestEven)
}

pub fn usd_to_tic(usd: Decimal, rounding: TokenRounding) -> Decimal {
    (usd / TIC_PRICE_USD).round_dp_with_strategy(TOKEN_SCALE, rounding.strategy())
}

pub fn usd_to_gic(usd: Decimal, rounding: TokenRounding) -> Decimal {
    (usd / GIC_PRICE_USD).round_dp_with_strategy(TOKEN_SCALE, rounding.strategy())
}

/// Yearly TIC allocation of a subscription plan; unknown plans get nothing.
pub fn yearly_allocation(plan_id: &str) -> Decimal {
    match plan_id {
        "vip" => Decimal::from(6900),
        "starter" => Decimal::from(500),
        _ => Decimal::ZERO,
    }
}

/// Daily share of the yearly allocation.
pub fn daily_allocation(plan_id: &str) -> Decimal {
    round_tokens(yearly_allocation(plan_id) / DAYS_PER_YEAR)
}

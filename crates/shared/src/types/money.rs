//! Money bounds.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal`. Every money column is
//! `NUMERIC(14,2)`, so an amount is storable only with at most two decimal
//! places and at most twelve integer digits.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Decimal places kept for every stored amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude a money column holds: `999_999_999_999.99`.
pub const MAX_MONEY: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, MONEY_SCALE);

/// Why an amount cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// More than two decimal places.
    #[error("{0} has more than 2 decimal places")]
    TooPrecise(Decimal),

    /// Magnitude above [`MAX_MONEY`].
    #[error("{0} exceeds the maximum amount of 999999999999.99")]
    OutOfRange(Decimal),
}

/// Checks that `amount` fits a money column and returns it at [`MONEY_SCALE`].
///
/// # Errors
///
/// Returns `MoneyError` if the amount is too large or too precise.
pub fn check_money(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount.abs() > MAX_MONEY {
        return Err(MoneyError::OutOfRange(amount));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(MoneyError::TooPrecise(amount));
    }
    Ok(round_money(amount))
}

/// Rounds to [`MONEY_SCALE`] (banker's rounding) and pads the scale, so the
/// value equals what a money column returns after a write.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(MONEY_SCALE);
    rounded
}

//! Fixed-scale decimal helpers.
//!
//! Amounts are carried as [`Decimal`] in memory and persisted as scaled `i64`
//! integers so that the store performs exact arithmetic on them. Each kind of
//! amount has its own scale:
//!
//! | amount                     | scale |
//! |----------------------------|-------|
//! | trade price, cash deltas   | 2     |
//! | journal lines, NAV figures | 4     |
//! | position quantities        | 6     |
//!
//! Rounding onto a scale is always half-up (midpoint away from zero).

use rust_decimal::{Decimal, RoundingStrategy};

pub const PRICE_SCALE: u32 = 2;
pub const CASH_SCALE: u32 = 2;
pub const JOURNAL_SCALE: u32 = 4;
pub const NAV_SCALE: u32 = 4;
pub const QUANTITY_SCALE: u32 = 6;

/// Round `value` half-up to `dp` decimal places and pin the scale to exactly `dp`.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded
}

/// Convert to the scaled integer representation used by the store.
///
/// Returns `None` when the scaled value does not fit in an `i64`.
pub fn to_fixed(value: Decimal, scale: u32) -> Option<i64> {
    let rounded = round_half_up(value, scale);
    i64::try_from(rounded.mantissa()).ok()
}

/// `quantity * price`, or `None` when the product does not fit a [`Decimal`].
pub fn notional(quantity: i64, price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity).checked_mul(price)
}

/// Inverse of [`to_fixed`].
pub fn from_fixed(raw: i64, scale: u32) -> Decimal {
    Decimal::new(raw, scale)
}

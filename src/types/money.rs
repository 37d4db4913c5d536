//! Fixed-scale monetary helpers
//!
//! Balances and amounts carry two fractional digits, exchange rates six.
//! Rounding is half-up (midpoint away from zero) everywhere.

use super::error::PaymentError;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Fractional digits kept for balances and amounts
pub const AMOUNT_SCALE: u32 = 2;

/// Fractional digits kept for exchange rates
pub const RATE_SCALE: u32 = 6;

/// Round to the amount scale and pin the scale so it renders as `x.yy`
pub fn round_amount(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(AMOUNT_SCALE);
    rounded
}

/// Round to the rate scale and pin the scale so it renders as `x.yyyyyy`
pub fn round_rate(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(RATE_SCALE);
    rounded
}

/// Parse a user-supplied amount
///
/// Accepts a positive decimal with at most two significant fractional digits
/// (`"10.50"` and `"10.500"` are fine, `"10.505"` is not). Anything else is
/// [`PaymentError::InvalidAmount`].
pub fn parse_amount(raw: &str) -> Result<Decimal, PaymentError> {
    let trimmed = raw.trim();
    let value = Decimal::from_str(trimmed).map_err(|_| PaymentError::invalid_amount(raw))?;

    if value <= Decimal::ZERO || value.normalize().scale() > AMOUNT_SCALE {
        return Err(PaymentError::invalid_amount(raw));
    }

    Ok(round_amount(value))
}

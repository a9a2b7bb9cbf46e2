//! Fixed-point arithmetic for the pool-ratio pricing curve.
//!
//! All ratios are carried at [`PRICE_SCALE`] and every division floors.
//! The buy path divides twice (scale the pool ratio, then divide the payment
//! by the scaled ratio); the two floors are part of the curve's observable
//! arithmetic, so the expression must not be algebraically collapsed into
//! `payment * own_pool / other_pool`.
//!
//! # Rounding Conventions
//! - Prices floor toward zero.
//! - Trade outputs and payouts floor toward zero.
//! - An output that floors to zero is an error ([`CurveError::Dust`]), except
//!   for redemption payouts, which may legitimately be zero.

use thiserror::Error;

/// Fixed-point scale for pool-ratio prices.
pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Errors that can occur during curve computation.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum CurveError {
    #[error("arithmetic overflow in curve computation")]
    Overflow,
    #[error("computed output rounds to zero")]
    Dust,
}

/// Spot price of the opposite side in units of the owned side, scaled by
/// [`PRICE_SCALE`] and floored.
///
/// # Errors
/// Returns [`CurveError::Overflow`] when `own_pool` is zero (the ratio is
/// undefined on a drained or never-seeded pool).
///
/// # Examples
/// ```
/// use predmarket::math::curve::{PRICE_SCALE, scaled_price};
///
/// // Balanced pools price at exactly 1.0.
/// assert_eq!(scaled_price(50, 50), Ok(PRICE_SCALE));
/// ```
pub fn scaled_price(own_pool: u64, other_pool: u64) -> Result<u128, CurveError> {
    if own_pool == 0 {
        return Err(CurveError::Overflow);
    }
    let scaled = u128::from(other_pool)
        .checked_mul(PRICE_SCALE)
        .ok_or(CurveError::Overflow)?;
    Ok(scaled / u128::from(own_pool))
}

/// Shares received for `payment` at `price_scaled`, floored.
///
/// # Errors
/// Returns [`CurveError::Overflow`] when the scaled price is zero or the
/// output exceeds `u64::MAX`, and [`CurveError::Dust`] when the output
/// floors to zero.
///
/// # Examples
/// ```
/// use predmarket::math::curve::{PRICE_SCALE, buy_output};
///
/// assert_eq!(buy_output(10, PRICE_SCALE), Ok(10));
/// ```
pub fn buy_output(payment: u64, price_scaled: u128) -> Result<u64, CurveError> {
    if price_scaled == 0 {
        return Err(CurveError::Overflow);
    }
    let wide = u128::from(payment)
        .checked_mul(PRICE_SCALE)
        .ok_or(CurveError::Overflow)?
        / price_scaled;
    let shares = u64::try_from(wide).map_err(|_| CurveError::Overflow)?;
    if shares == 0 {
        return Err(CurveError::Dust);
    }
    Ok(shares)
}

/// Collateral received for selling `shares` at `price_scaled`, floored.
///
/// # Errors
/// Returns [`CurveError::Overflow`] when the product exceeds the u128
/// intermediate or the payout exceeds `u64::MAX`, and [`CurveError::Dust`]
/// when the payout floors to zero.
pub fn sell_payout(shares: u64, price_scaled: u128) -> Result<u64, CurveError> {
    let wide = u128::from(shares)
        .checked_mul(price_scaled)
        .ok_or(CurveError::Overflow)?
        / PRICE_SCALE;
    let payout = u64::try_from(wide).map_err(|_| CurveError::Overflow)?;
    if payout == 0 {
        return Err(CurveError::Dust);
    }
    Ok(payout)
}

/// Pro-rata redemption payout: `floor(reserve * balance / winning_supply)`.
///
/// A zero payout is legitimate here; the caller's balance is consumed
/// regardless.
///
/// # Errors
/// Returns [`CurveError::Overflow`] when `winning_supply` is zero.
pub fn redemption_payout(
    reserve: u64,
    balance: u64,
    winning_supply: u64,
) -> Result<u64, CurveError> {
    if winning_supply == 0 {
        return Err(CurveError::Overflow);
    }
    let wide = u128::from(reserve)
        .checked_mul(u128::from(balance))
        .ok_or(CurveError::Overflow)?
        / u128::from(winning_supply);
    u64::try_from(wide).map_err(|_| CurveError::Overflow)
}

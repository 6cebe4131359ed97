//! # Fixed-Point Share Math
//!
//! Every conversion between shares and assets in the engine goes through
//! this module. All values are `u128` micro-units; products are taken in a
//! 256-bit intermediate so `amount * total_supply` can never overflow before
//! the division, and every quotient is floored.
//!
//! Each conversion rounds against the caller and in favor of the vault.
//!
//! Division by zero is reported as [`VaultError::ArithmeticOverflow`]. The
//! vault handles the empty bootstrap case (`total_supply == 0`) itself and
//! never asks this module to divide by an empty pool.

#![allow(clippy::assign_op_pattern)]
#![allow(clippy::manual_range_contains)]

use uint::construct_uint;

use crate::config::{BPS_DENOMINATOR, SCALE};
use crate::error::{VaultError, VaultResult};
use crate::types::Amount;

construct_uint! {
    /// 256-bit unsigned integer for widened products.
    pub struct U256(4);
}

// ---------------------------------------------------------------------------
// Checked arithmetic
// ---------------------------------------------------------------------------

/// Checked arithmetic on amounts that fails with
/// [`VaultError::ArithmeticOverflow`] instead of wrapping.
pub trait SafeMath: Sized {
    /// `self + rhs`.
    fn safe_add(self, rhs: Self) -> VaultResult<Self>;
    /// `self - rhs`.
    fn safe_sub(self, rhs: Self) -> VaultResult<Self>;
    /// `self * rhs`.
    fn safe_mul(self, rhs: Self) -> VaultResult<Self>;
}

impl SafeMath for Amount {
    #[inline]
    fn safe_add(self, rhs: Self) -> VaultResult<Self> {
        self.checked_add(rhs).ok_or(VaultError::ArithmeticOverflow)
    }

    #[inline]
    fn safe_sub(self, rhs: Self) -> VaultResult<Self> {
        self.checked_sub(rhs).ok_or(VaultError::ArithmeticOverflow)
    }

    #[inline]
    fn safe_mul(self, rhs: Self) -> VaultResult<Self> {
        self.checked_mul(rhs).ok_or(VaultError::ArithmeticOverflow)
    }
}

/// `floor(a * b / denominator)` with a 256-bit intermediate.
///
/// # Errors
///
/// [`VaultError::ArithmeticOverflow`] if `denominator` is zero or the
/// quotient does not fit in `u128`.
pub fn mul_div_floor(a: Amount, b: Amount, denominator: Amount) -> VaultResult<Amount> {
    if denominator == 0 {
        return Err(VaultError::ArithmeticOverflow);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(VaultError::ArithmeticOverflow)?;
    let quotient = product / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return Err(VaultError::ArithmeticOverflow);
    }
    Ok(quotient.low_u128())
}

// ---------------------------------------------------------------------------
// Share conversions
// ---------------------------------------------------------------------------

/// Shares minted for a deposit into a seeded pool:
/// `floor(amount * total_supply / total_assets)`.
pub fn shares_for_deposit(
    amount: Amount,
    total_supply: Amount,
    total_assets: Amount,
) -> VaultResult<Amount> {
    mul_div_floor(amount, total_supply, total_assets)
}

/// Assets owed for redeeming shares:
/// `floor(shares * total_assets / total_supply)`.
pub fn assets_for_shares(
    shares: Amount,
    total_supply: Amount,
    total_assets: Amount,
) -> VaultResult<Amount> {
    mul_div_floor(shares, total_assets, total_supply)
}

/// `floor(amount * fee_bps / 10_000)`.
pub fn fee_for(amount: Amount, fee_bps: u16) -> VaultResult<Amount> {
    mul_div_floor(amount, Amount::from(fee_bps), BPS_DENOMINATOR)
}

/// Price of one share in micro-units, `SCALE` (1.0) for an empty pool.
pub fn share_price(total_assets: Amount, total_supply: Amount) -> VaultResult<Amount> {
    if total_supply == 0 {
        return Ok(SCALE);
    }
    mul_div_floor(total_assets, SCALE, total_supply)
}

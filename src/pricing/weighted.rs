//! Weighted-pool pricing for liquidity bootstrapping sales.
//!
//! Balancer-style: the value of each side of the pool is fixed by its weight,
//! so the price is `(bi / wi) / (bo / wo)` and a trade keeps
//! `bi^wi * bo^wo` constant. Fractional powers have no integer form, so the
//! math runs in 96-bit decimals and balances beyond that range overflow.

use super::{Permill, to_u128};
use crate::errors::PricingError;
use alloy_primitives::U256;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};

fn decimal(value: u128) -> Result<Decimal, PricingError> {
    Decimal::from_u128(value).ok_or(PricingError::Overflow)
}

/// Both weights must be non-zero and add up to exactly one.
fn check_weights(wi: Permill, wo: Permill) -> Result<(), PricingError> {
    if wi.is_zero() || wo.is_zero() || wi.checked_add(wo) != Some(Permill::one()) {
        return Err(PricingError::InvalidRate);
    }
    Ok(())
}

/// Units of the input asset paid for `base_unit` of the output asset:
/// `floor(bi * wo * base_unit / (bo * wi))`, exact in 256 bits.
///
/// # Arguments
/// * `wi` - Weight of the asset being paid
/// * `wo` - Weight of the asset being priced
/// * `bi` - Pool balance of the asset being paid
/// * `bo` - Pool balance of the asset being priced
pub fn compute_spot_price(
    wi: Permill,
    wo: Permill,
    bi: u128,
    bo: u128,
    base_unit: u128,
) -> Result<u128, PricingError> {
    check_weights(wi, wo)?;
    if bi == 0 || bo == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    let numerator = (U256::from(bi) * U256::from(wo.deconstruct()))
        .checked_mul(U256::from(base_unit))
        .ok_or(PricingError::Overflow)?;
    let denominator = U256::from(bo) * U256::from(wi.deconstruct());
    to_u128(numerator / denominator)
}

/// `bo * (1 - (bi / (bi + ai))^(wi / wo))`, floor-rounded. `ai` is already
/// net of fees.
pub fn compute_out_given_in(
    wi: Permill,
    wo: Permill,
    bi: u128,
    bo: u128,
    ai: u128,
) -> Result<u128, PricingError> {
    check_weights(wi, wo)?;
    if bi == 0 || bo == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    if ai == 0 {
        return Err(PricingError::InvalidAmount);
    }
    let reserve_out = bo;
    let (bi, bo, ai) = (decimal(bi)?, decimal(bo)?, decimal(ai)?);
    let exponent = Decimal::from(wi.deconstruct()) / Decimal::from(wo.deconstruct());
    let ratio = bi
        .checked_add(ai)
        .and_then(|sum| bi.checked_div(sum))
        .ok_or(PricingError::Overflow)?;
    let kept = ratio.checked_powd(exponent).ok_or(PricingError::Overflow)?;
    let amount_out = Decimal::ONE
        .checked_sub(kept)
        .and_then(|taken| bo.checked_mul(taken))
        .and_then(|out| out.floor().to_u128())
        .ok_or(PricingError::Overflow)?;

    if amount_out == 0 {
        return Err(PricingError::InvalidAmount);
    }
    if amount_out >= reserve_out {
        return Err(PricingError::InsufficientLiquidity);
    }
    Ok(amount_out)
}

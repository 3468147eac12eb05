//! LP token math for depositing into and withdrawing from a two-asset pool.

use super::{Permill, isqrt, mul_div_ceil, mul_div_floor, stable_swap, to_u128};
use crate::errors::PricingError;
use alloy_primitives::U256;

/// LP minted for the very first deposit: the geometric mean of both amounts.
pub fn compute_first_deposit_lp(base_amount: u128, quote_amount: u128) -> Result<u128, PricingError> {
    if base_amount == 0 || quote_amount == 0 {
        return Err(PricingError::InvalidAmount);
    }
    to_u128(isqrt(U256::from(base_amount) * U256::from(quote_amount)))
}

/// Quote amount required alongside `base_amount` and the LP it mints.
///
/// On an empty pool (`lp_issuance == 0`) the quote amount is taken as given
/// and the first-deposit rule applies. Otherwise the deposit is pinned to the
/// current reserve ratio: the quote side is rounded up, the LP down.
pub fn compute_deposit_lp(
    lp_issuance: u128,
    base_amount: u128,
    quote_amount: u128,
    pool_base: u128,
    pool_quote: u128,
) -> Result<(u128, u128), PricingError> {
    if base_amount == 0 {
        return Err(PricingError::InvalidAmount);
    }
    if lp_issuance == 0 {
        let lp_to_mint = compute_first_deposit_lp(base_amount, quote_amount)?;
        return Ok((quote_amount, lp_to_mint));
    }
    if pool_base == 0 || pool_quote == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    let quote_required = mul_div_ceil(pool_quote, base_amount, pool_base)?;
    let lp_to_mint = mul_div_floor(lp_issuance, base_amount, pool_base)?;
    if lp_to_mint == 0 {
        return Err(PricingError::InvalidAmount);
    }
    Ok((quote_required, lp_to_mint))
}

/// Base and quote returned when burning `lp_amount` out of `lp_issuance`.
pub fn compute_redeemable_assets(
    lp_amount: u128,
    lp_issuance: u128,
    pool_base: u128,
    pool_quote: u128,
) -> Result<(u128, u128), PricingError> {
    if lp_amount == 0 {
        return Err(PricingError::InvalidAmount);
    }
    if lp_issuance == 0 || lp_amount > lp_issuance {
        return Err(PricingError::InsufficientLiquidity);
    }
    Ok((
        mul_div_floor(lp_amount, pool_base, lp_issuance)?,
        mul_div_floor(lp_amount, pool_quote, lp_issuance)?,
    ))
}

/// Result of depositing into a stable-swap pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableDeposit {
    pub lp_to_mint: u128,
    /// Share of the imbalance fee paid out to the pool owner, per asset.
    pub base_owner_fee: u128,
    pub quote_owner_fee: u128,
}

/// LP minted by a stable-swap deposit.
///
/// Unbalanced deposits pay an imbalance fee of `fee * n / (4 * (n - 1))`
/// (half the swap fee for two coins) on the distance from the ideal balances,
/// so deposit-then-withdraw costs about as much as a swap. `owner_fee_rate`
/// is the share of that fee which leaves the pool instead of staying with
/// the liquidity providers.
#[allow(clippy::too_many_arguments)]
pub fn compute_stable_deposit_lp(
    lp_issuance: u128,
    base_amount: u128,
    quote_amount: u128,
    pool_base: u128,
    pool_quote: u128,
    amplification_coefficient: u128,
    fee_rate: Permill,
    owner_fee_rate: Permill,
) -> Result<StableDeposit, PricingError> {
    if base_amount == 0 || quote_amount == 0 {
        return Err(PricingError::InvalidAmount);
    }
    let amp = amplification_coefficient;
    let new_base = pool_base.checked_add(base_amount).ok_or(PricingError::Overflow)?;
    let new_quote = pool_quote.checked_add(quote_amount).ok_or(PricingError::Overflow)?;

    let d0 = stable_swap::compute_d(pool_base, pool_quote, amp)?;
    let d1 = stable_swap::compute_d(new_base, new_quote, amp)?;
    if d1 <= d0 {
        return Err(PricingError::InvalidAmount);
    }

    if lp_issuance == 0 {
        return Ok(StableDeposit {
            lp_to_mint: d1,
            base_owner_fee: 0,
            quote_owner_fee: 0,
        });
    }
    if d0 == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }

    let imbalance_fee = fee_rate.mul(Permill::from_percent(50));
    let ideal_base = mul_div_floor(d1, pool_base, d0)?;
    let ideal_quote = mul_div_floor(d1, pool_quote, d0)?;
    let base_fee = imbalance_fee.mul_floor(ideal_base.abs_diff(new_base));
    let quote_fee = imbalance_fee.mul_floor(ideal_quote.abs_diff(new_quote));

    // a deposit lopsided enough can owe more fee than the side it lands on
    let base_after_fee = new_base
        .checked_sub(base_fee)
        .ok_or(PricingError::InsufficientLiquidity)?;
    let quote_after_fee = new_quote
        .checked_sub(quote_fee)
        .ok_or(PricingError::InsufficientLiquidity)?;
    let d2 = stable_swap::compute_d(base_after_fee, quote_after_fee, amp)?;
    let lp_to_mint = mul_div_floor(lp_issuance, d2.saturating_sub(d0), d0)?;
    if lp_to_mint == 0 {
        return Err(PricingError::InvalidAmount);
    }

    Ok(StableDeposit {
        lp_to_mint,
        base_owner_fee: owner_fee_rate.mul_floor(base_fee),
        quote_owner_fee: owner_fee_rate.mul_floor(quote_fee),
    })
}

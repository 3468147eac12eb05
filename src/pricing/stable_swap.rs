//! Two-coin stable-swap (Curve) pricing.
//!
//! The invariant `A * n^n * sum(x) + D = A * D * n^n + D^(n+1) / (n^n * prod(x))`
//! is solved by Newton iteration in 256-bit integers. `Ann` below is
//! `A * n^n` with `n = 2`.

use super::{Permill, to_u128};
use crate::errors::PricingError;
use alloy_primitives::U256;

const N_COINS: u64 = 2;
const MAX_ITERATIONS: usize = 255;

fn ann(amplification_coefficient: u128) -> Result<U256, PricingError> {
    if amplification_coefficient == 0 {
        return Err(PricingError::InvalidRate);
    }
    U256::from(amplification_coefficient)
        .checked_mul(U256::from(N_COINS * N_COINS))
        .ok_or(PricingError::Overflow)
}

fn converged(current: U256, previous: U256) -> bool {
    let diff = if current > previous {
        current - previous
    } else {
        previous - current
    };
    diff <= U256::from(1u8)
}

fn mul(a: U256, b: U256) -> Result<U256, PricingError> {
    a.checked_mul(b).ok_or(PricingError::Overflow)
}

fn add(a: U256, b: U256) -> Result<U256, PricingError> {
    a.checked_add(b).ok_or(PricingError::Overflow)
}

fn div(a: U256, b: U256) -> Result<U256, PricingError> {
    if b.is_zero() {
        return Err(PricingError::InsufficientLiquidity);
    }
    Ok(a / b)
}

/// Invariant `D` for balances `(x, y)`.
///
/// Converged once two successive estimates differ by at most one unit.
pub fn compute_d(x: u128, y: u128, amplification_coefficient: u128) -> Result<u128, PricingError> {
    let ann = ann(amplification_coefficient)?;
    if x == 0 && y == 0 {
        return Ok(0);
    }
    if x == 0 || y == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    let n = U256::from(N_COINS);
    let (x, y) = (U256::from(x), U256::from(y));
    let sum = x + y;
    let one = U256::from(1u8);

    let mut d = sum;
    for _ in 0..MAX_ITERATIONS {
        // d_p = d^(n+1) / (n^n * x * y)
        let mut d_p = d;
        d_p = div(mul(d_p, d)?, mul(x, n)?)?;
        d_p = div(mul(d_p, d)?, mul(y, n)?)?;

        let previous = d;
        // d = (ann * sum + d_p * n) * d / ((ann - 1) * d + (n + 1) * d_p)
        let numerator = mul(add(mul(ann, sum)?, mul(d_p, n)?)?, d)?;
        let denominator = add(mul(ann - one, d)?, mul(n + one, d_p)?)?;
        d = div(numerator, denominator)?;

        if converged(d, previous) {
            return to_u128(d);
        }
    }
    Err(PricingError::Convergence)
}

/// Counter balance `y` that keeps invariant `d` once the other balance is `x`.
///
/// Solves `y^2 + y * (b - d) = c` with `b = x + d / Ann` and
/// `c = d^(n+1) / (n^n * x * Ann)` by iterating `y = (y^2 + c) / (2y + b - d)`.
pub fn compute_y(x: u128, d: u128, amplification_coefficient: u128) -> Result<u128, PricingError> {
    let ann = ann(amplification_coefficient)?;
    if x == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    let n = U256::from(N_COINS);
    let (x, d) = (U256::from(x), U256::from(d));

    let mut c = div(mul(d, d)?, mul(x, n)?)?;
    c = div(mul(c, d)?, mul(ann, n)?)?;
    let b = add(x, div(d, ann)?)?;

    let mut y = d;
    for _ in 0..MAX_ITERATIONS {
        let previous = y;
        let denominator = add(mul(U256::from(2u8), y)?, b)?
            .checked_sub(d)
            .ok_or(PricingError::Convergence)?;
        y = div(add(mul(y, y)?, c)?, denominator)?;

        if converged(y, previous) {
            return to_u128(y);
        }
    }
    Err(PricingError::Convergence)
}

/// Stable-swap counterpart of
/// [`compute_output_amount`](super::constant_product::compute_output_amount).
///
/// Same fee and rounding policy: the fee is cut from the input, the result is
/// floor-rounded (one unit is held back to absorb the iteration error) and is
/// always below `reserve_out`.
pub fn compute_output_amount(
    reserve_in: u128,
    reserve_out: u128,
    amount_in: u128,
    fee_rate: Permill,
    amplification_coefficient: u128,
) -> Result<u128, PricingError> {
    let fee_rate = fee_rate.ensure_fraction()?;
    if amplification_coefficient == 0 {
        return Err(PricingError::InvalidRate);
    }
    if amount_in == 0 {
        return Err(PricingError::InvalidAmount);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    let effective_in = amount_in - fee_rate.mul_floor(amount_in);
    if effective_in == 0 {
        return Err(PricingError::InvalidAmount);
    }

    let d = compute_d(reserve_in, reserve_out, amplification_coefficient)?;
    let new_reserve_in = reserve_in
        .checked_add(effective_in)
        .ok_or(PricingError::Overflow)?;
    let new_reserve_out = compute_y(new_reserve_in, d, amplification_coefficient)?;

    let amount_out = reserve_out
        .checked_sub(new_reserve_out)
        .and_then(|out| out.checked_sub(1))
        .unwrap_or(0);
    if amount_out == 0 {
        return Err(PricingError::InvalidAmount);
    }
    if amount_out >= reserve_out {
        return Err(PricingError::InsufficientLiquidity);
    }
    Ok(amount_out)
}

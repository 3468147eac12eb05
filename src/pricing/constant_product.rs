//! Constant-product (`x * y = k`) pricing.
//!
//! The fee is cut from the input before the invariant is enforced; LP supply
//! is never inflated by it. All intermediate products are computed in 256 bits
//! so reserves can use the whole `u128` range.

use super::{Permill, mul_div_ceil, mul_div_floor, to_u128};
use crate::errors::PricingError;
use alloy_primitives::U256;

/// Amount of the counter asset received for `amount_in`, net of `fee_rate`.
///
/// # Arguments
/// * `reserve_in` - Pool balance of the asset being sold
/// * `reserve_out` - Pool balance of the asset being bought
/// * `amount_in` - Gross input amount, fee included
/// * `fee_rate` - Total fee fraction charged on the input, in `[0, 1)`
///
/// # Returns
/// The floor-rounded output, always strictly below `reserve_out`.
pub fn compute_output_amount(
    reserve_in: u128,
    reserve_out: u128,
    amount_in: u128,
    fee_rate: Permill,
) -> Result<u128, PricingError> {
    let fee_rate = fee_rate.ensure_fraction()?;
    if amount_in == 0 {
        return Err(PricingError::InvalidAmount);
    }
    let effective_in = amount_in - fee_rate.mul_floor(amount_in);
    compute_out_given_in(reserve_in, reserve_out, effective_in)
}

/// Fee-free leg of [`compute_output_amount`]:
/// `floor(reserve_out * amount_in / (reserve_in + amount_in))`, which is the
/// exact floor of `reserve_out - k / (reserve_in + amount_in)`.
pub fn compute_out_given_in(
    reserve_in: u128,
    reserve_out: u128,
    amount_in: u128,
) -> Result<u128, PricingError> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    if amount_in == 0 {
        return Err(PricingError::InvalidAmount);
    }
    let denominator = reserve_in
        .checked_add(amount_in)
        .ok_or(PricingError::Overflow)?;
    let amount_out = mul_div_floor(reserve_out, amount_in, denominator)?;

    if amount_out == 0 {
        // trade too small to move a single unit out
        return Err(PricingError::InvalidAmount);
    }
    if amount_out >= reserve_out {
        return Err(PricingError::InsufficientLiquidity);
    }
    Ok(amount_out)
}

/// Gross input (fee included) required to receive exactly `amount_out`.
///
/// Rounded up at every step so the pool never ends up below its invariant.
pub fn compute_input_amount(
    reserve_in: u128,
    reserve_out: u128,
    amount_out: u128,
    fee_rate: Permill,
) -> Result<u128, PricingError> {
    let fee_rate = fee_rate.ensure_fraction()?;
    if amount_out == 0 {
        return Err(PricingError::InvalidAmount);
    }
    if reserve_in == 0 || reserve_out == 0 || amount_out >= reserve_out {
        return Err(PricingError::InsufficientLiquidity);
    }
    let effective_in = mul_div_ceil(reserve_in, amount_out, reserve_out - amount_out)?;
    let left = fee_rate.left_from_one().deconstruct() as u128;
    mul_div_ceil(effective_in, Permill::one().deconstruct() as u128, left)
}

/// `floor(output * (1 - slippage_tolerance))`.
pub fn compute_minimum_received(
    output_amount: u128,
    slippage_tolerance: Permill,
) -> Result<u128, PricingError> {
    let tolerance = slippage_tolerance.ensure_fraction()?;
    Ok(tolerance.left_from_one().mul_floor(output_amount))
}

/// Quote units paid for `base_unit` of base at the current reserves.
pub fn compute_spot_price(
    base_reserve: u128,
    quote_reserve: u128,
    base_unit: u128,
) -> Result<u128, PricingError> {
    if base_reserve == 0 || quote_reserve == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    mul_div_floor(quote_reserve, base_unit, base_reserve)
}

/// Shortfall of `amount_out` relative to what the spot price would pay for
/// `amount_in`, as a fraction of the latter.
///
/// Both sides are compared as exact 256-bit cross products, so the ideal
/// output never has to fit in a `u128`.
pub fn compute_price_impact(
    reserve_in: u128,
    reserve_out: u128,
    amount_in: u128,
    amount_out: u128,
) -> Result<Permill, PricingError> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    let ideal = U256::from(amount_in) * U256::from(reserve_out);
    let actual = U256::from(amount_out) * U256::from(reserve_in);
    if ideal.is_zero() || actual >= ideal {
        return Ok(Permill::zero());
    }
    let shortfall = ideal - actual;
    let ppm = U256::from(Permill::one().deconstruct());
    let parts = match shortfall.checked_mul(ppm) {
        Some(scaled) => scaled / ideal,
        // ideal is above 2^236 here, so dropping its low digits is harmless
        None => shortfall / (ideal / ppm),
    };
    Ok(Permill::from_parts(to_u128(parts)? as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_percent_fee_on_balanced_pool() {
        let out = compute_output_amount(1_000_000, 1_000_000, 1_000, Permill::from_percent(1))
            .unwrap();
        // effective input 990 -> 1_000_000 * 990 / 1_000_990 = 989.02
        assert_eq!(out, 989);
    }

    #[test]
    fn large_input_on_small_pool_is_still_valid() {
        assert_eq!(compute_output_amount(100, 100, 1_000, Permill::zero()), Ok(90));
    }

    #[test]
    fn zero_input_is_invalid() {
        assert_eq!(
            compute_output_amount(100, 100, 0, Permill::zero()),
            Err(PricingError::InvalidAmount)
        );
    }

    #[test]
    fn empty_reserves_have_no_liquidity() {
        assert_eq!(
            compute_output_amount(0, 100, 10, Permill::zero()),
            Err(PricingError::InsufficientLiquidity)
        );
        assert_eq!(
            compute_output_amount(100, 0, 10, Permill::zero()),
            Err(PricingError::InsufficientLiquidity)
        );
    }

    #[test]
    fn fee_of_one_is_rejected() {
        assert_eq!(
            compute_output_amount(100, 100, 10, Permill::one()),
            Err(PricingError::InvalidRate)
        );
    }

    #[test]
    fn dust_that_rounds_to_nothing_is_invalid() {
        assert_eq!(
            compute_output_amount(1_000_000, 10, 1, Permill::zero()),
            Err(PricingError::InvalidAmount)
        );
    }

    #[test]
    fn pool_is_never_drained() {
        let reserves = [1u128, 7, 1_000, 1_000_000, 10u128.pow(24)];
        for &reserve_in in &reserves {
            for &reserve_out in &reserves {
                for multiplier in [1u128, 10, 1_000, 1_000_000] {
                    let amount_in = reserve_in * multiplier;
                    match compute_output_amount(
                        reserve_in,
                        reserve_out,
                        amount_in,
                        Permill::from_bps(30),
                    ) {
                        Ok(out) => assert!(out < reserve_out),
                        Err(e) => assert_eq!(e, PricingError::InvalidAmount),
                    }
                }
            }
        }
    }

    #[test]
    fn fee_free_swap_keeps_the_product_within_one_unit() {
        let cases = [
            (1_000_000u128, 2_000_000u128, 12_345u128),
            (5_000, 7_000, 4_999),
            (10u128.pow(18), 3 * 10u128.pow(12), 10u128.pow(15)),
        ];
        for (reserve_in, reserve_out, amount_in) in cases {
            let out = compute_output_amount(reserve_in, reserve_out, amount_in, Permill::zero())
                .unwrap();
            let k = reserve_in * reserve_out;
            let new_in = reserve_in + amount_in;
            assert!(new_in * (reserve_out - out) >= k);
            assert!(new_in * (reserve_out - out - 1) < k);
        }
    }

    #[test]
    fn output_grows_with_input() {
        let mut previous = 0;
        for amount_in in (1_000..200_000u128).step_by(1_000) {
            let out = compute_output_amount(1_000_000, 1_000_000, amount_in, Permill::from_bps(30))
                .unwrap();
            assert!(out > previous);
            previous = out;
        }
    }

    #[test]
    fn minimum_received_respects_tolerance() {
        assert_eq!(compute_minimum_received(989, Permill::zero()), Ok(989));
        assert_eq!(compute_minimum_received(1_000, Permill::from_percent(1)), Ok(990));
        let mut previous = u128::MAX;
        for parts in (0..1_000_000).step_by(50_000) {
            let min = compute_minimum_received(123_456_789, Permill::from_parts(parts)).unwrap();
            assert!(min <= previous);
            previous = min;
        }
        assert_eq!(
            compute_minimum_received(10, Permill::one()),
            Err(PricingError::InvalidRate)
        );
    }

    #[test]
    fn input_for_exact_output_buys_at_least_that_output() {
        let fee = Permill::from_bps(30);
        for amount_out in [1u128, 17, 989, 250_000] {
            let amount_in = compute_input_amount(1_000_000, 1_000_000, amount_out, fee).unwrap();
            let realized = compute_output_amount(1_000_000, 1_000_000, amount_in, fee).unwrap();
            assert!(realized >= amount_out);
        }
        assert_eq!(
            compute_input_amount(1_000, 1_000, 1_000, fee),
            Err(PricingError::InsufficientLiquidity)
        );
    }

    #[test]
    fn spot_price_and_impact() {
        assert_eq!(compute_spot_price(2_000, 4_000, 1_000), Ok(2_000));
        let out = compute_output_amount(1_000_000, 1_000_000, 100_000, Permill::zero()).unwrap();
        let impact = compute_price_impact(1_000_000, 1_000_000, 100_000, out).unwrap();
        // 90_909 received instead of 100_000
        assert_eq!(impact, Permill::from_parts(90_910));
    }

    #[test]
    fn impact_on_lopsided_reserves_does_not_overflow() {
        let reserve_out = 10u128.pow(36);
        let out = compute_output_amount(1_000, reserve_out, 1_000_000, Permill::zero()).unwrap();
        // spot would pay 10^39, far beyond u128
        let impact = compute_price_impact(1_000, reserve_out, 1_000_000, out).unwrap();
        assert_eq!(impact, Permill::from_parts(999_000));
        assert_eq!(
            compute_price_impact(1, u128::MAX, u128::MAX, 1),
            Ok(Permill::from_parts(999_999))
        );
    }
}

//! Pure AMM pricing math.
//!
//! Every function here only reads its arguments, so they can be called from
//! any thread without synchronization.

use crate::errors::PricingError;
use alloy_primitives::U256;

pub mod constant_product;
pub mod liquidity;
pub mod rate;
pub mod stable_swap;
pub mod weighted;

pub use constant_product::{compute_minimum_received, compute_output_amount};
pub use rate::Permill;

/// `floor(a * b / c)` with a 256-bit intermediate.
pub(crate) fn mul_div_floor(a: u128, b: u128, c: u128) -> Result<u128, PricingError> {
    if c == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    let value = U256::from(a) * U256::from(b) / U256::from(c);
    to_u128(value)
}

/// `ceil(a * b / c)` with a 256-bit intermediate.
pub(crate) fn mul_div_ceil(a: u128, b: u128, c: u128) -> Result<u128, PricingError> {
    if c == 0 {
        return Err(PricingError::InsufficientLiquidity);
    }
    let numerator = U256::from(a) * U256::from(b);
    let divisor = U256::from(c);
    let mut value = numerator / divisor;
    if !(numerator % divisor).is_zero() {
        value += U256::from(1u8);
    }
    to_u128(value)
}

pub(crate) fn to_u128(value: U256) -> Result<u128, PricingError> {
    u128::try_from(value).map_err(|_| PricingError::Overflow)
}

/// Integer square root (floor) by Newton's method.
pub(crate) fn isqrt(value: U256) -> U256 {
    if value.is_zero() {
        return U256::ZERO;
    }
    let two = U256::from(2u8);
    let mut x = value;
    let mut y = x / two + x % two;
    while y < x {
        x = y;
        y = (x + value / x) / two;
    }
    x
}

use crate::errors::PricingError;
use bigdecimal::BigDecimal;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const PARTS_PER_MILLION: u32 = 1_000_000;

/// A fraction in parts per million, `0 ..= 1`.
///
/// Fee rates, owner-fee splits and slippage tolerances are all expressed with
/// this type so that every multiplication stays in integer space.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct Permill(u32);

impl Permill {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn one() -> Self {
        Self(PARTS_PER_MILLION)
    }

    /// Parts above one million saturate to `one()`.
    pub const fn from_parts(parts: u32) -> Self {
        if parts > PARTS_PER_MILLION {
            Self(PARTS_PER_MILLION)
        } else {
            Self(parts)
        }
    }

    pub const fn from_percent(percent: u32) -> Self {
        Self::from_parts(percent.saturating_mul(10_000))
    }

    /// Basis points (1 bps = 100 ppm).
    pub const fn from_bps(bps: u32) -> Self {
        Self::from_parts(bps.saturating_mul(100))
    }

    /// Converts a floating fraction (e.g. `0.003`) rounding to the nearest ppm.
    pub fn from_fraction(fraction: f64) -> Result<Self, PricingError> {
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(PricingError::InvalidRate);
        }
        Ok(Self((fraction * PARTS_PER_MILLION as f64).round() as u32))
    }

    /// Parses a decimal fraction such as `"0.005"`. Digits below one ppm are
    /// truncated.
    pub fn from_decimal_str(raw: &str) -> Result<Self, PricingError> {
        let value = BigDecimal::from_str(raw.trim()).map_err(|_| PricingError::InvalidRate)?;
        if value < BigDecimal::zero() || value > BigDecimal::from(1u32) {
            return Err(PricingError::InvalidRate);
        }
        let parts = (value * BigDecimal::from(PARTS_PER_MILLION)).with_scale(0);
        parts
            .to_u32()
            .map(Self::from_parts)
            .ok_or(PricingError::InvalidRate)
    }

    pub const fn deconstruct(self) -> u32 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_one(self) -> bool {
        self.0 == PARTS_PER_MILLION
    }

    pub const fn left_from_one(self) -> Self {
        Self(PARTS_PER_MILLION - self.0)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        let sum = self.0.checked_add(other.0)?;
        (sum <= PARTS_PER_MILLION).then_some(Self(sum))
    }

    /// `self * other`, floor-rounded.
    pub fn mul(self, other: Self) -> Self {
        Self(((self.0 as u64 * other.0 as u64) / PARTS_PER_MILLION as u64) as u32)
    }

    /// Rejects `one()`: fees and tolerances must stay strictly below 1.
    pub fn ensure_fraction(self) -> Result<Self, PricingError> {
        if self.0 < PARTS_PER_MILLION {
            Ok(self)
        } else {
            Err(PricingError::InvalidRate)
        }
    }

    /// `amount * self`, rounded down. Never overflows since `self <= 1`.
    pub fn mul_floor(self, amount: u128) -> u128 {
        let ppm = PARTS_PER_MILLION as u128;
        let parts = self.0 as u128;
        (amount / ppm) * parts + (amount % ppm) * parts / ppm
    }

    /// `amount * self`, rounded up.
    pub fn mul_ceil(self, amount: u128) -> u128 {
        let ppm = PARTS_PER_MILLION as u128;
        let parts = self.0 as u128;
        (amount / ppm) * parts + ((amount % ppm) * parts).div_ceil(ppm)
    }
}

impl TryFrom<u32> for Permill {
    type Error = PricingError;

    fn try_from(parts: u32) -> Result<Self, Self::Error> {
        if parts > PARTS_PER_MILLION {
            return Err(PricingError::InvalidRate);
        }
        Ok(Self(parts))
    }
}

impl From<Permill> for u32 {
    fn from(value: Permill) -> Self {
        value.0
    }
}

impl fmt::Display for Permill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}%", self.0 / 10_000, self.0 % 10_000)
    }
}

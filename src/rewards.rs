//! Crowdloan reward accrual.
//!
//! A contributor receives `initial_payment` of their reward as soon as vesting
//! starts; the rest unlocks linearly over `vesting_period`, in increments of
//! `vesting_step`.

use crate::errors::VestingError;
use crate::models::Balance;
use crate::pricing::{Permill, mul_div_floor};
use crate::utils::u128_string;
use serde::{Deserialize, Serialize};

/// Chain-wide crowdloan constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardParams {
    pub initial_payment: Permill,
    /// Granularity of the linear release, in milliseconds. Zero releases
    /// continuously.
    pub vesting_step: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdloanReward {
    #[serde(with = "u128_string")]
    pub total: Balance,
    #[serde(with = "u128_string")]
    pub claimed: Balance,
    /// Milliseconds from vesting start until the whole reward is released.
    pub vesting_period: u64,
}

impl CrowdloanReward {
    pub fn new(total: Balance, vesting_period: u64) -> Self {
        Self {
            total,
            claimed: 0,
            vesting_period,
        }
    }

    /// Amount released between `start` and `now`, claimed or not.
    pub fn should_have_claimed(
        &self,
        start: u64,
        now: u64,
        params: &RewardParams,
    ) -> Result<Balance, VestingError> {
        let upfront = params.initial_payment.mul_floor(self.total);
        let vesting_point = now.saturating_sub(start);
        if vesting_point >= self.vesting_period {
            return Ok(self.total);
        }
        let vesting_window = match params.vesting_step {
            0 => vesting_point,
            step => vesting_point - vesting_point % step,
        };
        let vested = mul_div_floor(
            self.total - upfront,
            vesting_window as u128,
            self.vesting_period as u128,
        )
        .map_err(|_| VestingError::Overflow)?;
        upfront.checked_add(vested).ok_or(VestingError::Overflow)
    }

    pub fn available_to_claim(
        &self,
        start: u64,
        now: u64,
        params: &RewardParams,
    ) -> Result<Balance, VestingError> {
        Ok(self
            .should_have_claimed(start, now, params)?
            .saturating_sub(self.claimed))
    }

    /// Claims everything released so far and returns the amount.
    pub fn claim(
        &mut self,
        start: u64,
        now: u64,
        params: &RewardParams,
    ) -> Result<Balance, VestingError> {
        let amount = self.available_to_claim(start, now, params)?;
        if amount == 0 {
            return Err(VestingError::NothingToClaim);
        }
        self.claimed += amount;
        Ok(amount)
    }
}

//! Vesting schedules as stored by the chain's vesting pallet.
//!
//! A schedule releases `per_period` every `period` (blocks or milliseconds,
//! depending on the window) starting at `start`, `period_count` times.

use crate::errors::VestingError;
use crate::models::Balance;
use crate::utils::u128_string;
use serde::{Deserialize, Serialize};

/// Point in time a schedule is evaluated at. Block-based windows read
/// `block`, moment-based windows read `moment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VestingTime {
    pub block: u64,
    /// Unix time in milliseconds.
    pub moment: u64,
}

impl VestingTime {
    pub fn new(block: u64, moment: u64) -> Self {
        Self { block, moment }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VestingWindow {
    BlockNumberBased { start: u64, period: u64 },
    MomentBased { start: u64, period: u64 },
}

impl VestingWindow {
    pub fn start(&self) -> u64 {
        match *self {
            Self::BlockNumberBased { start, .. } | Self::MomentBased { start, .. } => start,
        }
    }

    pub fn period(&self) -> u64 {
        match *self {
            Self::BlockNumberBased { period, .. } | Self::MomentBased { period, .. } => period,
        }
    }

    fn now(&self, at: VestingTime) -> u64 {
        match self {
            Self::BlockNumberBased { .. } => at.block,
            Self::MomentBased { .. } => at.moment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VestingSchedule {
    pub window: VestingWindow,
    pub period_count: u32,
    #[serde(with = "u128_string")]
    pub per_period: Balance,
    #[serde(with = "u128_string")]
    pub already_claimed: Balance,
}

impl VestingSchedule {
    pub fn new(
        window: VestingWindow,
        period_count: u32,
        per_period: Balance,
    ) -> Result<Self, VestingError> {
        let schedule = Self {
            window,
            period_count,
            per_period,
            already_claimed: 0,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<(), VestingError> {
        if self.window.period() == 0 {
            return Err(VestingError::ZeroVestingPeriod);
        }
        if self.period_count == 0 {
            return Err(VestingError::ZeroVestingPeriodCount);
        }
        self.end()?;
        if self.already_claimed > self.total_amount()? {
            return Err(VestingError::ClaimedExceedsTotal);
        }
        Ok(())
    }

    /// First block/moment at which everything is vested.
    pub fn end(&self) -> Result<u64, VestingError> {
        self.window
            .period()
            .checked_mul(self.period_count as u64)
            .and_then(|span| span.checked_add(self.window.start()))
            .ok_or(VestingError::Overflow)
    }

    pub fn total_amount(&self) -> Result<Balance, VestingError> {
        self.per_period
            .checked_mul(self.period_count as u128)
            .ok_or(VestingError::Overflow)
    }

    /// Completed periods at `at`, capped at `period_count`.
    fn elapsed_periods(&self, at: VestingTime) -> u64 {
        let now = self.window.now(at);
        let period = self.window.period();
        if period == 0 {
            return 0;
        }
        let elapsed = now.saturating_sub(self.window.start()) / period;
        elapsed.min(self.period_count as u64)
    }

    pub fn vested_amount(&self, at: VestingTime) -> Result<Balance, VestingError> {
        self.per_period
            .checked_mul(self.elapsed_periods(at) as u128)
            .ok_or(VestingError::Overflow)
    }

    pub fn locked_amount(&self, at: VestingTime) -> Result<Balance, VestingError> {
        Ok(self.total_amount()? - self.vested_amount(at)?)
    }

    pub fn claimable_amount(&self, at: VestingTime) -> Result<Balance, VestingError> {
        Ok(self.vested_amount(at)?.saturating_sub(self.already_claimed))
    }

    /// Claims everything vested so far and returns the amount released.
    pub fn claim(&mut self, at: VestingTime) -> Result<Balance, VestingError> {
        let amount = self.claimable_amount(at)?;
        if amount == 0 {
            return Err(VestingError::NothingToClaim);
        }
        self.already_claimed += amount;
        Ok(amount)
    }

    /// Fully claimed schedules can be dropped from the account.
    pub fn is_fully_claimed(&self) -> bool {
        self.total_amount()
            .map(|total| self.already_claimed >= total)
            .unwrap_or(false)
    }
}

use super::state::{Pool, PoolKind};
use crate::errors::PricingError;
use crate::models::{AssetId, Balance, PoolId};
use crate::pricing::{Permill, constant_product, stable_swap, weighted};
use crate::utils::u128_string;
use serde::{Deserialize, Serialize};

/// Fee charged on a swap, in the input asset.
///
/// `lp_fee + owner_fee + protocol_fee == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    pub asset_id: AssetId,
    #[serde(with = "u128_string")]
    pub total: Balance,
    /// Part that stays in the pool for liquidity providers.
    #[serde(with = "u128_string")]
    pub lp_fee: Balance,
    /// Part paid out to the pool owner.
    #[serde(with = "u128_string")]
    pub owner_fee: Balance,
    /// Part of the owner's share forwarded to the protocol.
    #[serde(default, with = "u128_string")]
    pub protocol_fee: Balance,
}

impl Fee {
    /// Amount taken out of the pool rather than left to liquidity providers.
    pub fn leaving_pool(&self) -> Balance {
        self.owner_fee + self.protocol_fee
    }
}

/// Quote for swapping a fixed input amount against a pool snapshot.
///
/// Derived and ephemeral: recompute it whenever the snapshot changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub pool_id: PoolId,
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    #[serde(with = "u128_string")]
    pub amount_in: Balance,
    #[serde(with = "u128_string")]
    pub amount_out: Balance,
    pub fee: Fee,
    /// `amount_out` reduced by `slippage_tolerance`; the swap must fail on
    /// chain if less is delivered.
    #[serde(with = "u128_string")]
    pub minimum_received: Balance,
    pub slippage_tolerance: Permill,
    /// Shortfall against the pre-trade price (spot for constant product and
    /// weighted pools, par for stable swap), fee included.
    pub price_impact: Permill,
}

impl Pool {
    /// Quote selling `amount_in` of `asset_in`.
    pub fn quote(
        &self,
        asset_in: AssetId,
        amount_in: Balance,
        slippage_tolerance: Permill,
    ) -> Result<SwapQuote, PricingError> {
        let (asset_out, reserve_in, reserve_out) = self.direction(asset_in)?;
        let fee_rate = self.fee.fee_rate.ensure_fraction()?;

        let (amount_out, price_impact) = match self.kind {
            PoolKind::ConstantProduct => {
                let out = constant_product::compute_output_amount(
                    reserve_in,
                    reserve_out,
                    amount_in,
                    fee_rate,
                )?;
                let impact =
                    constant_product::compute_price_impact(reserve_in, reserve_out, amount_in, out)?;
                (out, impact)
            }
            PoolKind::StableSwap {
                amplification_coefficient,
            } => {
                let out = stable_swap::compute_output_amount(
                    reserve_in,
                    reserve_out,
                    amount_in,
                    fee_rate,
                    amplification_coefficient as u128,
                )?;
                let impact = constant_product::compute_price_impact(1, 1, amount_in, out)?;
                (out, impact)
            }
            PoolKind::LiquidityBootstrapping {
                sale,
                current_block,
            } => {
                let (wi, wo) = self.sale_weights(&sale, current_block, asset_in)?;
                let effective_in = amount_in
                    .checked_sub(fee_rate.mul_floor(amount_in))
                    .filter(|a| *a > 0)
                    .ok_or(PricingError::InvalidAmount)?;
                let out =
                    weighted::compute_out_given_in(wi, wo, reserve_in, reserve_out, effective_in)?;
                // spot price of a weighted pool is that of reserves scaled by
                // the opposite weight
                let impact = constant_product::compute_price_impact(
                    scale(reserve_in, wo)?,
                    scale(reserve_out, wi)?,
                    amount_in,
                    out,
                )?;
                (out, impact)
            }
        };

        self.finish_quote(
            asset_in,
            asset_out,
            amount_in,
            amount_out,
            slippage_tolerance,
            price_impact,
        )
    }

    /// Quote buying exactly `amount_out` of `asset_out`. Constant-product
    /// pools only.
    pub fn quote_exact_out(
        &self,
        asset_out: AssetId,
        amount_out: Balance,
        slippage_tolerance: Permill,
    ) -> Result<SwapQuote, PricingError> {
        if self.kind != PoolKind::ConstantProduct {
            return Err(PricingError::UnsupportedPoolKind);
        }
        let asset_in = self
            .pair
            .counterpart(asset_out)
            .ok_or(PricingError::AssetNotInPool)?;
        let (_, reserve_in, reserve_out) = self.direction(asset_in)?;
        let amount_in = constant_product::compute_input_amount(
            reserve_in,
            reserve_out,
            amount_out,
            self.fee.fee_rate,
        )?;
        let price_impact =
            constant_product::compute_price_impact(reserve_in, reserve_out, amount_in, amount_out)?;
        self.finish_quote(
            asset_in,
            asset_out,
            amount_in,
            amount_out,
            slippage_tolerance,
            price_impact,
        )
    }

    fn finish_quote(
        &self,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: Balance,
        amount_out: Balance,
        slippage_tolerance: Permill,
        price_impact: Permill,
    ) -> Result<SwapQuote, PricingError> {
        let fee = self
            .fee
            .calculate_fees(asset_in, self.fee.fee_rate.mul_floor(amount_in));
        let minimum_received =
            constant_product::compute_minimum_received(amount_out, slippage_tolerance)?;

        Ok(SwapQuote {
            pool_id: self.id,
            asset_in,
            asset_out,
            amount_in,
            amount_out,
            fee,
            minimum_received,
            slippage_tolerance,
            price_impact,
        })
    }
}

fn scale(reserve: Balance, weight: Permill) -> Result<Balance, PricingError> {
    reserve
        .checked_mul(weight.deconstruct() as u128)
        .ok_or(PricingError::Overflow)
}

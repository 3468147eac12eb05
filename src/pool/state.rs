use super::quote::Fee;
use crate::errors::PricingError;
use crate::models::{AssetId, Balance, CurrencyPair, PoolId};
use crate::pricing::{Permill, constant_product, liquidity, weighted};
use crate::utils::u128_string;
use serde::{Deserialize, Serialize};

/// Trading fee charged on the swap input, and how it is shared out.
///
/// `owner_fee_rate` is the owner's share of the fee and `protocol_fee_rate`
/// the protocol's share of that owner fee. Whatever is left of the fee stays
/// in the pool for liquidity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeConfig {
    pub fee_rate: Permill,
    pub owner_fee_rate: Permill,
    #[serde(default)]
    pub protocol_fee_rate: Permill,
}

impl FeeConfig {
    pub fn new(fee_rate: Permill, owner_fee_rate: Permill) -> Result<Self, PricingError> {
        let config = Self {
            fee_rate,
            owner_fee_rate,
            protocol_fee_rate: Permill::zero(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Split used by pools created on chain: a fifth of the fee is taken out
    /// of the pool and all of it goes to the protocol.
    pub fn default_from(fee_rate: Permill) -> Result<Self, PricingError> {
        Ok(Self::new(fee_rate, Permill::from_percent(20))?.with_protocol_fee_rate(Permill::one()))
    }

    pub fn with_protocol_fee_rate(mut self, protocol_fee_rate: Permill) -> Self {
        self.protocol_fee_rate = protocol_fee_rate;
        self
    }

    /// The trading fee must stay below 1; the shares may be anything up to 1.
    pub fn validate(&self) -> Result<(), PricingError> {
        self.fee_rate.ensure_fraction().map(|_| ())
    }

    /// Splits `fee`, already charged in `asset_id`, between liquidity
    /// providers, owner and protocol. Parts always add up to `fee`.
    pub fn calculate_fees(&self, asset_id: AssetId, fee: Balance) -> Fee {
        let owner_share = self.owner_fee_rate.mul_floor(fee);
        let protocol_fee = self.protocol_fee_rate.mul_floor(owner_share);
        Fee {
            asset_id,
            total: fee,
            lp_fee: fee - owner_share,
            owner_fee: owner_share - protocol_fee,
            protocol_fee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleState {
    NotStarted,
    Ongoing,
    Ended,
}

/// Sale window of a liquidity bootstrapping pool, in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub start: u64,
    pub end: u64,
    /// Weight of the base (project) asset at `start`.
    pub initial_weight: Permill,
    /// Weight of the base asset from `end` on.
    pub final_weight: Permill,
}

impl Sale {
    pub fn duration(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn state(&self, block: u64) -> SaleState {
        if block < self.start {
            SaleState::NotStarted
        } else if block >= self.end {
            SaleState::Ended
        } else {
            SaleState::Ongoing
        }
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.end <= self.start {
            return Err(PricingError::InvalidSaleState);
        }
        if self.initial_weight < self.final_weight
            || self.final_weight.is_zero()
            || self.initial_weight.is_one()
        {
            return Err(PricingError::InvalidRate);
        }
        Ok(())
    }

    /// `(base, quote)` weights at `block`. The base weight falls linearly
    /// from `initial_weight` to `final_weight` over the sale; the quote weight
    /// is the rest.
    pub fn current_weights(&self, block: u64) -> Result<(Permill, Permill), PricingError> {
        let elapsed = block
            .checked_sub(self.start)
            .ok_or(PricingError::InvalidSaleState)?
            .min(self.duration());
        let duration = self.duration().max(1) as u128;
        let point_in_sale = Permill::from_parts(
            (elapsed as u128 * Permill::one().deconstruct() as u128 / duration) as u32,
        );
        let weight_range = Permill::from_parts(
            self.initial_weight
                .deconstruct()
                .checked_sub(self.final_weight.deconstruct())
                .ok_or(PricingError::InvalidRate)?,
        );
        let base = self.initial_weight.deconstruct() - point_in_sale.mul(weight_range).deconstruct();
        let base = Permill::from_parts(base);
        Ok((base, base.left_from_one()))
    }
}

/// Pricing curve of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PoolKind {
    ConstantProduct,
    #[serde(rename_all = "camelCase")]
    StableSwap { amplification_coefficient: u16 },
    /// Weighted pool whose weights shift over a sale; `current_block` is the
    /// block the snapshot was read at.
    #[serde(rename_all = "camelCase")]
    LiquidityBootstrapping { sale: Sale, current_block: u64 },
}

/// Immutable snapshot of a two-asset pool.
///
/// Operations that would change the pool return a new snapshot; the pool
/// itself lives on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: PoolId,
    pub pair: CurrencyPair,
    #[serde(with = "u128_string")]
    pub base_reserve: Balance,
    #[serde(with = "u128_string")]
    pub quote_reserve: Balance,
    /// Total LP token supply.
    #[serde(with = "u128_string")]
    pub lp_issuance: Balance,
    pub fee: FeeConfig,
    pub kind: PoolKind,
}

/// Outcome of a simulated deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityAdded {
    pub base_amount: Balance,
    pub quote_amount: Balance,
    pub minted_lp: Balance,
}

/// Outcome of a simulated withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityRemoved {
    pub base_amount: Balance,
    pub quote_amount: Balance,
    pub total_issuance: Balance,
}

impl Pool {
    pub fn new(
        id: PoolId,
        pair: CurrencyPair,
        base_reserve: Balance,
        quote_reserve: Balance,
        fee: FeeConfig,
        kind: PoolKind,
    ) -> Result<Self, PricingError> {
        let pool = Self {
            id,
            pair,
            base_reserve,
            quote_reserve,
            lp_issuance: 0,
            fee,
            kind,
        };
        pool.validate()?;
        Ok(pool)
    }

    pub fn with_lp_issuance(mut self, lp_issuance: Balance) -> Self {
        self.lp_issuance = lp_issuance;
        self
    }

    /// Checks the invariants a snapshot received from the wire must hold.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.pair.base == self.pair.quote {
            return Err(PricingError::InvalidPair);
        }
        self.fee.validate()?;
        match self.kind {
            PoolKind::StableSwap {
                amplification_coefficient: 0,
            } => Err(PricingError::InvalidRate),
            PoolKind::ConstantProduct | PoolKind::StableSwap { .. } => Ok(()),
            PoolKind::LiquidityBootstrapping { sale, .. } => sale.validate(),
        }
    }

    /// Sale and snapshot block of a liquidity bootstrapping pool.
    fn sale(&self) -> Option<(Sale, u64)> {
        match self.kind {
            PoolKind::LiquidityBootstrapping {
                sale,
                current_block,
            } => Some((sale, current_block)),
            _ => None,
        }
    }

    /// `(weight_in, weight_out)` for a trade paying `asset_in` into a
    /// liquidity bootstrapping pool. Only defined while the sale runs.
    pub(crate) fn sale_weights(
        &self,
        sale: &Sale,
        current_block: u64,
        asset_in: AssetId,
    ) -> Result<(Permill, Permill), PricingError> {
        if sale.state(current_block) != SaleState::Ongoing {
            return Err(PricingError::InvalidSaleState);
        }
        let (base, quote) = sale.current_weights(current_block)?;
        if asset_in == self.pair.base {
            Ok((base, quote))
        } else {
            Ok((quote, base))
        }
    }

    pub fn reserve_of(&self, asset: AssetId) -> Result<Balance, PricingError> {
        if asset == self.pair.base {
            Ok(self.base_reserve)
        } else if asset == self.pair.quote {
            Ok(self.quote_reserve)
        } else {
            Err(PricingError::AssetNotInPool)
        }
    }

    /// `(asset_out, reserve_in, reserve_out)` for a trade paying `asset_in`.
    pub fn direction(&self, asset_in: AssetId) -> Result<(AssetId, Balance, Balance), PricingError> {
        let asset_out = self
            .pair
            .counterpart(asset_in)
            .ok_or(PricingError::AssetNotInPool)?;
        Ok((asset_out, self.reserve_of(asset_in)?, self.reserve_of(asset_out)?))
    }

    /// Quote units per `base_unit` of base.
    pub fn spot_price(&self, base_unit: Balance) -> Result<Balance, PricingError> {
        match self.sale() {
            Some((sale, current_block)) => {
                let (wi, wo) = self.sale_weights(&sale, current_block, self.pair.quote)?;
                weighted::compute_spot_price(
                    wi,
                    wo,
                    self.quote_reserve,
                    self.base_reserve,
                    base_unit,
                )
            }
            None => constant_product::compute_spot_price(
                self.base_reserve,
                self.quote_reserve,
                base_unit,
            ),
        }
    }

    fn with_reserve(mut self, asset: AssetId, reserve: Balance) -> Self {
        if asset == self.pair.base {
            self.base_reserve = reserve;
        } else {
            self.quote_reserve = reserve;
        }
        self
    }

    /// Pool after `quote` executes: input goes in minus the owner and
    /// protocol fees, which are paid out, and the output leaves.
    pub fn simulate_swap(&self, quote: &super::SwapQuote) -> Result<Pool, PricingError> {
        if quote.pool_id != self.id {
            return Err(PricingError::PoolMismatch);
        }
        let (asset_out, reserve_in, reserve_out) = self.direction(quote.asset_in)?;
        if asset_out != quote.asset_out {
            return Err(PricingError::AssetNotInPool);
        }
        let retained_in = quote
            .amount_in
            .checked_sub(quote.fee.leaving_pool())
            .ok_or(PricingError::InvalidAmount)?;
        let new_in = reserve_in
            .checked_add(retained_in)
            .ok_or(PricingError::Overflow)?;
        let new_out = reserve_out
            .checked_sub(quote.amount_out)
            .filter(|r| *r > 0)
            .ok_or(PricingError::InsufficientLiquidity)?;
        Ok(self
            .clone()
            .with_reserve(quote.asset_in, new_in)
            .with_reserve(asset_out, new_out))
    }

    /// Deposit `base_amount` (and up to `quote_amount`) into the pool.
    ///
    /// Constant-product pools take the quote side at the current ratio;
    /// stable-swap pools take both amounts as given. Liquidity bootstrapping
    /// pools are only funded before their sale starts and mint no LP.
    pub fn simulate_add_liquidity(
        &self,
        base_amount: Balance,
        quote_amount: Balance,
        min_mint_amount: Balance,
    ) -> Result<(Pool, LiquidityAdded), PricingError> {
        let (quote_amount, minted_lp, base_owner_fee, quote_owner_fee) = match self.kind {
            PoolKind::ConstantProduct => {
                let (quote_required, minted) = liquidity::compute_deposit_lp(
                    self.lp_issuance,
                    base_amount,
                    quote_amount,
                    self.base_reserve,
                    self.quote_reserve,
                )?;
                if self.lp_issuance > 0 && quote_required > quote_amount {
                    return Err(PricingError::CannotRespectMinimumRequested);
                }
                (quote_required, minted, 0, 0)
            }
            PoolKind::StableSwap {
                amplification_coefficient,
            } => {
                let deposit = liquidity::compute_stable_deposit_lp(
                    self.lp_issuance,
                    base_amount,
                    quote_amount,
                    self.base_reserve,
                    self.quote_reserve,
                    amplification_coefficient as u128,
                    self.fee.fee_rate,
                    self.fee.owner_fee_rate,
                )?;
                (
                    quote_amount,
                    deposit.lp_to_mint,
                    deposit.base_owner_fee,
                    deposit.quote_owner_fee,
                )
            }
            PoolKind::LiquidityBootstrapping {
                sale,
                current_block,
            } => {
                if sale.state(current_block) != SaleState::NotStarted {
                    return Err(PricingError::InvalidSaleState);
                }
                if base_amount == 0 {
                    return Err(PricingError::InvalidAmount);
                }
                (quote_amount, 0, 0, 0)
            }
        };
        if quote_amount == 0 {
            return Err(PricingError::InvalidAmount);
        }
        if minted_lp < min_mint_amount {
            return Err(PricingError::CannotRespectMinimumRequested);
        }

        let mut pool = self.clone();
        pool.base_reserve = add(pool.base_reserve, base_amount)? - base_owner_fee;
        pool.quote_reserve = add(pool.quote_reserve, quote_amount)? - quote_owner_fee;
        pool.lp_issuance = add(pool.lp_issuance, minted_lp)?;
        Ok((
            pool,
            LiquidityAdded {
                base_amount,
                quote_amount,
                minted_lp,
            },
        ))
    }

    /// Burn `lp_amount` for a proportional share of both reserves.
    pub fn simulate_remove_liquidity(
        &self,
        lp_amount: Balance,
        min_base_amount: Balance,
        min_quote_amount: Balance,
    ) -> Result<(Pool, LiquidityRemoved), PricingError> {
        if self.sale().is_some() {
            return Err(PricingError::UnsupportedPoolKind);
        }
        let (base_amount, quote_amount) = liquidity::compute_redeemable_assets(
            lp_amount,
            self.lp_issuance,
            self.base_reserve,
            self.quote_reserve,
        )?;
        if base_amount < min_base_amount || quote_amount < min_quote_amount {
            return Err(PricingError::CannotRespectMinimumRequested);
        }
        let mut pool = self.clone();
        pool.base_reserve -= base_amount;
        pool.quote_reserve -= quote_amount;
        pool.lp_issuance -= lp_amount;
        Ok((
            pool.clone(),
            LiquidityRemoved {
                base_amount,
                quote_amount,
                total_issuance: pool.lp_issuance,
            },
        ))
    }
}

fn add(a: Balance, b: Balance) -> Result<Balance, PricingError> {
    a.checked_add(b).ok_or(PricingError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PICA: AssetId = 1;
    const USDT: AssetId = 130;
    const USDC: AssetId = 131;

    fn product_pool() -> Pool {
        Pool::new(
            7,
            CurrencyPair::new(PICA, USDT),
            4_000_000,
            1_000_000,
            FeeConfig::new(Permill::from_bps(30), Permill::zero()).unwrap(),
            PoolKind::ConstantProduct,
        )
        .unwrap()
        .with_lp_issuance(2_000_000)
    }

    #[test]
    fn rejects_bad_configuration() {
        let pair = CurrencyPair::new(PICA, PICA);
        let fee = FeeConfig::default();
        assert_eq!(
            Pool::new(0, pair, 1, 1, fee, PoolKind::ConstantProduct),
            Err(PricingError::InvalidPair)
        );
        assert_eq!(
            FeeConfig::new(Permill::one(), Permill::zero()),
            Err(PricingError::InvalidRate)
        );
        // shares of the fee may reach 1, only the fee itself may not
        assert!(FeeConfig::new(Permill::from_percent(60), Permill::one()).is_ok());
        let stable = PoolKind::StableSwap {
            amplification_coefficient: 0,
        };
        assert_eq!(
            Pool::new(0, CurrencyPair::new(PICA, USDT), 1, 1, fee, stable),
            Err(PricingError::InvalidRate)
        );
        let backwards = PoolKind::LiquidityBootstrapping {
            sale: Sale {
                start: 10,
                end: 10,
                initial_weight: Permill::from_percent(90),
                final_weight: Permill::from_percent(50),
            },
            current_block: 0,
        };
        assert_eq!(
            Pool::new(0, CurrencyPair::new(PICA, USDT), 1, 1, fee, backwards),
            Err(PricingError::InvalidSaleState)
        );
    }

    #[test]
    fn fee_parts_add_up() {
        let fee = FeeConfig::default_from(Permill::from_bps(30)).unwrap();
        assert_eq!(fee.owner_fee_rate, Permill::from_percent(20));
        assert_eq!(fee.protocol_fee_rate, Permill::one());
        let split = fee.with_protocol_fee_rate(Permill::from_percent(50)).calculate_fees(USDT, 1_001);
        assert_eq!(split.lp_fee, 801);
        assert_eq!(split.owner_fee, 100);
        assert_eq!(split.protocol_fee, 100);
        assert_eq!(split.lp_fee + split.owner_fee + split.protocol_fee, split.total);
    }

    #[test]
    fn sale_weights_move_linearly() {
        let sale = Sale {
            start: 100,
            end: 200,
            initial_weight: Permill::from_percent(90),
            final_weight: Permill::from_percent(50),
        };
        assert_eq!(sale.state(99), SaleState::NotStarted);
        assert_eq!(sale.state(100), SaleState::Ongoing);
        assert_eq!(sale.state(200), SaleState::Ended);
        assert_eq!(
            sale.current_weights(100),
            Ok((Permill::from_percent(90), Permill::from_percent(10)))
        );
        assert_eq!(
            sale.current_weights(125),
            Ok((Permill::from_percent(80), Permill::from_percent(20)))
        );
        assert_eq!(
            sale.current_weights(500),
            Ok((Permill::from_percent(50), Permill::from_percent(50)))
        );
        assert_eq!(sale.current_weights(99), Err(PricingError::InvalidSaleState));
    }

    #[test]
    fn direction_follows_the_pair() {
        let pool = product_pool();
        assert_eq!(pool.direction(USDT), Ok((PICA, 1_000_000, 4_000_000)));
        assert_eq!(pool.direction(PICA), Ok((USDT, 4_000_000, 1_000_000)));
        assert_eq!(pool.direction(42), Err(PricingError::AssetNotInPool));
        assert_eq!(pool.spot_price(1_000), Ok(250));
    }

    #[test]
    fn add_then_remove_liquidity() {
        let pool = product_pool();
        let (after_add, added) = pool.simulate_add_liquidity(400_000, 200_000, 1).unwrap();
        assert_eq!(added.quote_amount, 100_000);
        assert_eq!(added.minted_lp, 200_000);
        assert_eq!(after_add.base_reserve, 4_400_000);
        assert_eq!(after_add.lp_issuance, 2_200_000);

        let (after_remove, removed) = after_add.simulate_remove_liquidity(200_000, 0, 0).unwrap();
        assert_eq!(removed.base_amount, 400_000);
        assert_eq!(removed.quote_amount, 100_000);
        assert_eq!(removed.total_issuance, 2_000_000);
        assert_eq!(after_remove, pool);
    }

    #[test]
    fn liquidity_minimums_are_enforced() {
        let pool = product_pool();
        assert_eq!(
            pool.simulate_add_liquidity(400_000, 200_000, 200_001)
                .map(|(_, added)| added),
            Err(PricingError::CannotRespectMinimumRequested)
        );
        assert_eq!(
            pool.simulate_add_liquidity(400_000, 99_999, 0)
                .map(|(_, added)| added),
            Err(PricingError::CannotRespectMinimumRequested)
        );
        assert_eq!(
            pool.simulate_remove_liquidity(200_000, 400_001, 0)
                .map(|(_, removed)| removed),
            Err(PricingError::CannotRespectMinimumRequested)
        );
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let pool = product_pool();
        let json = serde_json::to_value(&pool).unwrap();
        assert_eq!(json["baseReserve"], "4000000");
        assert_eq!(json["kind"]["type"], "constantProduct");
        let back: Pool = serde_json::from_value(json).unwrap();
        assert_eq!(back, pool);

        let sale: PoolKind = serde_json::from_str(
            r#"{"type": "liquidityBootstrapping", "currentBlock": 150,
                "sale": {"start": 100, "end": 200, "initialWeight": 900000, "finalWeight": 500000}}"#,
        )
        .unwrap();
        let PoolKind::LiquidityBootstrapping { sale, current_block } = sale else {
            panic!("expected a liquidity bootstrapping pool");
        };
        assert_eq!(current_block, 150);
        assert_eq!(sale.current_weights(current_block).unwrap().0, Permill::from_percent(70));
    }

    fn stable_pool() -> Pool {
        Pool::new(
            8,
            CurrencyPair::new(USDC, USDT),
            1_000_000,
            1_000_000,
            FeeConfig::default_from(Permill::from_bps(30)).unwrap(),
            PoolKind::StableSwap {
                amplification_coefficient: 100,
            },
        )
        .unwrap()
        .with_lp_issuance(2_000_000)
    }

    #[test]
    fn stable_deposit_keeps_the_lp_fee_in_the_pool() {
        let pool = stable_pool();
        let (after, added) = pool.simulate_add_liquidity(300_000, 100_000, 399_659).unwrap();
        assert_eq!(added.quote_amount, 100_000);
        assert_eq!(added.minted_lp, 399_659);
        // the owner's fifth of the imbalance fee leaves the pool
        assert_eq!(after.base_reserve, 1_300_000 - 30);
        assert_eq!(after.quote_reserve, 1_100_000 - 29);
        assert_eq!(after.lp_issuance, 2_399_659);

        assert_eq!(
            pool.simulate_add_liquidity(300_000, 100_000, 399_660)
                .map(|(_, added)| added),
            Err(PricingError::CannotRespectMinimumRequested)
        );
    }

    #[test]
    fn lopsided_stable_deposit_fails_cleanly() {
        let pool = stable_pool();
        assert_eq!(
            pool.simulate_add_liquidity(1, 1_000_000_000_000, 0)
                .map(|(_, added)| added),
            Err(PricingError::InsufficientLiquidity)
        );
    }

    #[test]
    fn bootstrapping_pool_is_funded_before_the_sale() {
        let sale = Sale {
            start: 100,
            end: 200,
            initial_weight: Permill::from_percent(90),
            final_weight: Permill::from_percent(50),
        };
        let at = |current_block| {
            Pool::new(
                9,
                CurrencyPair::new(PICA, USDT),
                0,
                0,
                FeeConfig::new(Permill::from_bps(30), Permill::zero()).unwrap(),
                PoolKind::LiquidityBootstrapping {
                    sale,
                    current_block,
                },
            )
            .unwrap()
        };
        let (funded, added) = at(50).simulate_add_liquidity(9_000_000, 1_000_000, 0).unwrap();
        assert_eq!(added.minted_lp, 0);
        assert_eq!(funded.base_reserve, 9_000_000);
        assert_eq!(funded.quote_reserve, 1_000_000);
        assert_eq!(
            at(100).simulate_add_liquidity(1, 1, 0).map(|(_, added)| added),
            Err(PricingError::InvalidSaleState)
        );
        assert_eq!(
            funded.simulate_remove_liquidity(1, 0, 0).map(|(_, removed)| removed),
            Err(PricingError::UnsupportedPoolKind)
        );
    }
}

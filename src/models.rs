//! Shared data structures used throughout the application.

use serde::{Deserialize, Serialize};

pub type AssetId = u128;
pub type PoolId = u64;
pub type Balance = u128;

/// Ordered asset pair of a pool. In a swap call `base` is the asset received
/// and `quote` the asset paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: AssetId,
    pub quote: AssetId,
}

impl CurrencyPair {
    pub fn new(base: AssetId, quote: AssetId) -> Self {
        Self { base, quote }
    }

    pub fn swap(self) -> Self {
        Self {
            base: self.quote,
            quote: self.base,
        }
    }

    pub fn contains(&self, asset: AssetId) -> bool {
        self.base == asset || self.quote == asset
    }

    /// The other asset of the pair, if `asset` belongs to it.
    pub fn counterpart(&self, asset: AssetId) -> Option<AssetId> {
        if asset == self.base {
            Some(self.quote)
        } else if asset == self.quote {
            Some(self.base)
        } else {
            None
        }
    }
}

/// An amount of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub asset_id: AssetId,
    #[serde(with = "crate::utils::u128_string")]
    pub amount: Balance,
}

impl AssetAmount {
    pub fn new(asset_id: AssetId, amount: Balance) -> Self {
        Self { asset_id, amount }
    }
}

/// Whether a submission is acknowledged at block inclusion or at finality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaitFor {
    #[default]
    InBlock,
    Finalized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_helpers() {
        let pair = CurrencyPair::new(1, 4);
        assert_eq!(pair.swap(), CurrencyPair::new(4, 1));
        assert!(pair.contains(4));
        assert_eq!(pair.counterpart(1), Some(4));
        assert_eq!(pair.counterpart(7), None);
    }

    #[test]
    fn amounts_travel_as_strings() {
        let json = serde_json::to_string(&AssetAmount::new(1, u128::MAX)).unwrap();
        assert_eq!(
            json,
            r#"{"asset_id":1,"amount":"340282366920938463463374607431768211455"}"#
        );
        let back: AssetAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back.amount, u128::MAX);
    }
}

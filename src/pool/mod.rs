//! Pool snapshots and the quotes derived from them.

pub mod quote;
pub mod state;

pub use quote::{Fee, SwapQuote};
pub use state::{FeeConfig, LiquidityAdded, LiquidityRemoved, Pool, PoolKind, Sale, SaleState};

//! Boundary to the parachain: wire types, the [`ChainClient`] seam and its
//! WebSocket JSON-RPC implementation.

pub mod watcher;
pub mod ws;

use crate::errors::{ChainError, Result};
use crate::models::{AssetAmount, AssetId, Balance, CurrencyPair, PoolId, WaitFor};
use crate::pool::{Fee, Pool};
use crate::utils::u128_string;
use serde::{Deserialize, Serialize};
use std::future::Future;

pub use watcher::spawn_pool_watcher;
pub use ws::WsChainClient;

/// Arguments of the pallet's `swap` extrinsic. `pair.base` is the asset
/// received, `pair.quote` the asset paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapCall {
    pub pool_id: PoolId,
    pub pair: CurrencyPair,
    #[serde(with = "u128_string")]
    pub quote_amount: Balance,
    #[serde(with = "u128_string")]
    pub min_receive: Balance,
    pub keep_alive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedSwap {
    pub call: SwapCall,
    /// `0x`-prefixed signer address.
    pub signer: String,
    /// `0x`-prefixed 65-byte signature over the JSON encoding of `call`.
    pub signature: String,
}

/// The pool's `Swapped` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEvent {
    pub pool_id: PoolId,
    pub who: String,
    pub base_asset: AssetId,
    pub quote_asset: AssetId,
    /// Amount received.
    #[serde(with = "u128_string")]
    pub base_amount: Balance,
    /// Amount paid.
    #[serde(with = "u128_string")]
    pub quote_amount: Balance,
    pub fee: Fee,
}

impl SwapEvent {
    pub fn received(&self) -> AssetAmount {
        AssetAmount::new(self.base_asset, self.base_amount)
    }

    pub fn paid(&self) -> AssetAmount {
        AssetAmount::new(self.quote_asset, self.quote_amount)
    }
}

/// Lifecycle notifications of a submitted swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TxStatus {
    Ready,
    #[serde(rename_all = "camelCase")]
    InBlock {
        block_hash: String,
        #[serde(default)]
        swapped: Option<SwapEvent>,
    },
    #[serde(rename_all = "camelCase")]
    Finalized {
        block_hash: String,
        #[serde(default)]
        swapped: Option<SwapEvent>,
    },
    Invalid {
        reason: String,
    },
    Dropped,
    DispatchError {
        #[serde(default)]
        module: Option<String>,
        error: String,
    },
}

/// Where and how a swap landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub block_hash: String,
    pub finalized: bool,
    pub event: SwapEvent,
}

/// Access to pool state and swap submission on the chain.
///
/// Implementations serve one outstanding request per call; callers that need
/// concurrency hold separate futures.
pub trait ChainClient: Send + Sync {
    fn fetch_pool(&self, pool_id: PoolId) -> impl Future<Output = Result<Pool>> + Send;

    /// Submits `swap` and resolves once it reached `wait_for` with a
    /// `Swapped` event, or with the first failure the chain reports.
    fn submit_swap(
        &self,
        swap: &SignedSwap,
        wait_for: WaitFor,
    ) -> impl Future<Output = Result<SwapReceipt>> + Send;
}

/// Maps an RPC or pool error message onto the failures callers act on.
pub fn classify_error(code: Option<i64>, message: &str, data: Option<&str>) -> ChainError {
    let detail = data.unwrap_or(message);
    let haystack = format!("{message} {detail}").to_lowercase();
    if haystack.contains("badorigin") || haystack.contains("bad origin") {
        ChainError::BadOrigin
    } else if haystack.contains("inability to pay some fees")
        || haystack.contains("insufficientbalance")
        || haystack.contains("balance too low")
    {
        ChainError::InsufficientBalance(detail.to_string())
    } else if haystack.contains("priority is too low") {
        ChainError::PriorityTooLow(detail.to_string())
    } else if let Some(code) = code {
        ChainError::Rpc {
            code,
            message: match data {
                Some(data) => format!("{message}: {data}"),
                None => message.to_string(),
            },
        }
    } else {
        ChainError::Invalid(detail.to_string())
    }
}

/// Folds status notifications into the final outcome of a submission.
#[derive(Debug)]
pub struct SubmissionTracker {
    wait_for: WaitFor,
    in_block: Option<SwapEvent>,
}

impl SubmissionTracker {
    pub fn new(wait_for: WaitFor) -> Self {
        Self {
            wait_for,
            in_block: None,
        }
    }

    /// `None` while the submission is still in flight.
    pub fn on_status(&mut self, status: TxStatus) -> Option<std::result::Result<SwapReceipt, ChainError>> {
        match status {
            TxStatus::Ready => None,
            TxStatus::InBlock {
                block_hash,
                swapped,
            } => match (self.wait_for, swapped) {
                (WaitFor::InBlock, Some(event)) => Some(Ok(SwapReceipt {
                    block_hash,
                    finalized: false,
                    event,
                })),
                (WaitFor::InBlock, None) => Some(Err(missing_event(&block_hash))),
                (WaitFor::Finalized, swapped) => {
                    self.in_block = swapped;
                    None
                }
            },
            TxStatus::Finalized {
                block_hash,
                swapped,
            } => Some(
                swapped
                    .or_else(|| self.in_block.take())
                    .map(|event| SwapReceipt {
                        block_hash: block_hash.clone(),
                        finalized: true,
                        event,
                    })
                    .ok_or_else(|| missing_event(&block_hash)),
            ),
            TxStatus::Invalid { reason } => Some(Err(classify_error(None, &reason, None))),
            TxStatus::Dropped => Some(Err(ChainError::Dropped)),
            TxStatus::DispatchError { module, error } => Some(Err(match module {
                Some(module) => ChainError::Dispatch { module, error },
                None => classify_error(None, &error, None),
            })),
        }
    }
}

fn missing_event(block_hash: &str) -> ChainError {
    ChainError::UnexpectedEvent(format!("no Swapped event in block {block_hash}"))
}

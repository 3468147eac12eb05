use super::signer::SwapSigner;
use crate::chain::{ChainClient, SwapCall, SwapReceipt};
use crate::errors::{ChainError, PricingError, Result};
use crate::models::{CurrencyPair, WaitFor};
use crate::pool::SwapQuote;
use std::sync::Arc;
use tracing::{info, warn};

/// A swap that landed on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub quote: SwapQuote,
    pub receipt: SwapReceipt,
}

impl SwapOutcome {
    /// Output received beyond the quote's minimum.
    pub fn surplus(&self) -> u128 {
        self.receipt
            .event
            .base_amount
            .saturating_sub(self.quote.minimum_received)
    }
}

/// Turn a quote into the pallet's `swap` call: the pair is ordered
/// (received, paid) and `min_receive` is the quote's slippage bound.
pub fn build_call(quote: &SwapQuote, keep_alive: bool) -> SwapCall {
    SwapCall {
        pool_id: quote.pool_id,
        pair: CurrencyPair::new(quote.asset_out, quote.asset_in),
        quote_amount: quote.amount_in,
        min_receive: quote.minimum_received,
        keep_alive,
    }
}

/// Signs and submits quoted swaps, one at a time, and checks the chain's
/// `Swapped` event against the quote.
///
/// Failures come back exactly as the chain reported them; nothing is retried.
pub struct SwapExecutor<C> {
    client: Arc<C>,
    signer: SwapSigner,
    keep_alive: bool,
    wait_for: WaitFor,
}

impl<C: ChainClient> SwapExecutor<C> {
    pub fn new(client: Arc<C>, signer: SwapSigner) -> Self {
        Self {
            client,
            signer,
            keep_alive: true,
            wait_for: WaitFor::default(),
        }
    }

    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn wait_for(mut self, wait_for: WaitFor) -> Self {
        self.wait_for = wait_for;
        self
    }

    pub async fn execute(&self, quote: &SwapQuote) -> Result<SwapOutcome> {
        let call = build_call(quote, self.keep_alive);
        let signed = self.signer.sign(call).await?;
        info!(
            pool_id = quote.pool_id,
            asset_in = %quote.asset_in,
            amount_in = %quote.amount_in,
            min_receive = %quote.minimum_received,
            signer = %signed.signer,
            "[SWAP] submitting"
        );

        let receipt = match self.client.submit_swap(&signed, self.wait_for).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %e, pool_id = quote.pool_id, "[SWAP] submission failed");
                return Err(e);
            }
        };
        check_event(quote, &receipt)?;

        let outcome = SwapOutcome {
            quote: *quote,
            receipt,
        };
        info!(
            pool_id = quote.pool_id,
            received = %outcome.receipt.event.base_amount,
            surplus = %outcome.surplus(),
            block = %outcome.receipt.block_hash,
            finalized = outcome.receipt.finalized,
            "[SWAP] swapped"
        );
        Ok(outcome)
    }
}

fn check_event(quote: &SwapQuote, receipt: &SwapReceipt) -> Result<()> {
    let event = &receipt.event;
    if event.pool_id != quote.pool_id
        || event.base_asset != quote.asset_out
        || event.quote_asset != quote.asset_in
    {
        return Err(ChainError::UnexpectedEvent(format!(
            "Swapped on pool {} ({} -> {}) does not match the quoted pool {} ({} -> {})",
            event.pool_id,
            event.quote_asset,
            event.base_asset,
            quote.pool_id,
            quote.asset_in,
            quote.asset_out,
        ))
        .into());
    }
    if event.base_amount < quote.minimum_received {
        return Err(PricingError::CannotRespectMinimumRequested.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{SignedSwap, SwapEvent};
    use crate::errors::AppError;
    use crate::models::{AssetAmount, PoolId};
    use crate::pool::{Fee, FeeConfig, Pool, PoolKind};
    use crate::pricing::Permill;
    use std::sync::Mutex;

    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Answers every submission with a canned result and records what it got.
    struct MockChain {
        answer: std::result::Result<SwapReceipt, ChainError>,
        submitted: Mutex<Vec<(SignedSwap, WaitFor)>>,
    }

    impl MockChain {
        fn answering(answer: std::result::Result<SwapReceipt, ChainError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                submitted: Mutex::new(Vec::new()),
            })
        }
    }

    impl ChainClient for MockChain {
        async fn fetch_pool(&self, _: PoolId) -> Result<Pool> {
            Ok(pool())
        }

        async fn submit_swap(&self, swap: &SignedSwap, wait_for: WaitFor) -> Result<SwapReceipt> {
            self.submitted.lock().unwrap().push((swap.clone(), wait_for));
            self.answer.clone().map_err(Into::into)
        }
    }

    fn pool() -> Pool {
        Pool::new(
            3,
            CurrencyPair::new(1, 130),
            1_000_000,
            1_000_000,
            FeeConfig::new(Permill::from_percent(1), Permill::zero()).unwrap(),
            PoolKind::ConstantProduct,
        )
        .unwrap()
    }

    fn quote() -> SwapQuote {
        pool().quote(130, 1_000, Permill::from_percent(1)).unwrap()
    }

    fn receipt(base_amount: u128) -> SwapReceipt {
        SwapReceipt {
            block_hash: "0xfeed".into(),
            finalized: true,
            event: SwapEvent {
                pool_id: 3,
                who: "alice".into(),
                base_asset: 1,
                quote_asset: 130,
                base_amount,
                quote_amount: 1_000,
                fee: Fee {
                    asset_id: 130,
                    total: 10,
                    lp_fee: 10,
                    owner_fee: 0,
                    protocol_fee: 0,
                },
            },
        }
    }

    fn executor(chain: Arc<MockChain>) -> SwapExecutor<MockChain> {
        SwapExecutor::new(chain, SwapSigner::from_hex(DEV_KEY).unwrap())
    }

    #[test]
    fn call_orders_the_pair_received_first() {
        let call = build_call(&quote(), false);
        assert_eq!(call.pair, CurrencyPair::new(1, 130));
        assert_eq!(call.quote_amount, 1_000);
        assert_eq!(call.min_receive, 979);
        assert!(!call.keep_alive);
    }

    #[tokio::test]
    async fn executes_and_reports_the_realized_swap() {
        let chain = MockChain::answering(Ok(receipt(989)));
        let outcome = executor(chain.clone())
            .wait_for(WaitFor::Finalized)
            .execute(&quote())
            .await
            .unwrap();
        assert_eq!(outcome.receipt.event.received(), AssetAmount::new(1, 989));
        assert_eq!(outcome.receipt.event.paid(), AssetAmount::new(130, 1_000));
        assert_eq!(outcome.surplus(), 10);

        let submitted = chain.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let (signed, wait_for) = &submitted[0];
        assert_eq!(*wait_for, WaitFor::Finalized);
        assert_eq!(signed.call.min_receive, 979);
        assert!(signed.call.keep_alive);
    }

    #[tokio::test]
    async fn chain_failures_are_surfaced_once() {
        for failure in [
            ChainError::BadOrigin,
            ChainError::InsufficientBalance("balance too low".into()),
            ChainError::PriorityTooLow("Priority is too low: (1 vs 1)".into()),
        ] {
            let chain = MockChain::answering(Err(failure.clone()));
            match executor(chain.clone()).execute(&quote()).await {
                Err(AppError::Chain(e)) => assert_eq!(e, failure),
                other => panic!("unexpected {other:?}"),
            }
            assert_eq!(chain.submitted.lock().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn event_is_checked_against_the_quote() {
        let chain = MockChain::answering(Ok(receipt(978)));
        assert!(matches!(
            executor(chain).execute(&quote()).await,
            Err(AppError::Pricing(PricingError::CannotRespectMinimumRequested))
        ));

        let mut other_pool = receipt(989);
        other_pool.event.pool_id = 4;
        let chain = MockChain::answering(Ok(other_pool));
        assert!(matches!(
            executor(chain).execute(&quote()).await,
            Err(AppError::Chain(ChainError::UnexpectedEvent(_)))
        ));
    }
}

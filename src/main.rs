use anyhow::{Context, Result};
use pablo_quoter::{
    chain::{WsChainClient, spawn_pool_watcher},
    config::AppConfig,
    pool::Pool,
    swap::{SwapExecutor, SwapSigner},
    utils,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::load()?;
    tracing::info!(
        url = %config.rpc_ws_url,
        pool_id = config.pool_id,
        asset_in = %config.asset_in,
        amount_in = %config.amount_in,
        slippage = %config.slippage,
        execute_swap = config.execute_swap,
        "[INIT] pablo-quoter starting"
    );

    let client = Arc::new(WsChainClient::new(config.rpc_ws_url.clone()));
    let (mut pool_rx, _watcher) =
        spawn_pool_watcher(client.clone(), config.pool_id, config.quote_interval)
            .await
            .context("initial pool snapshot")?;
    tracing::info!(
        interval_secs = config.quote_interval.as_secs(),
        "[INIT] pool watcher started"
    );

    if config.execute_swap {
        let pool = pool_rx.borrow_and_update().clone();
        return execute_once(&config, client, &pool).await;
    }

    let mut ticker = tokio::time::interval(config.quote_interval);
    let mut ticks: u64 = 0;
    loop {
        ticker.tick().await;
        ticks += 1;
        let updated = pool_rx.has_changed().unwrap_or(false);
        let pool = pool_rx.borrow_and_update().clone();
        match pool.quote(config.asset_in, config.amount_in, config.slippage) {
            Ok(quote) => {
                if updated || ticks == 1 {
                    tracing::info!(
                        pool_id = quote.pool_id,
                        amount_in = %quote.amount_in,
                        amount_out = %quote.amount_out,
                        fee = %quote.fee.total,
                        minimum_received = %quote.minimum_received,
                        price_impact = %quote.price_impact,
                        "[QUOTE] swap quote"
                    );
                } else if ticks % 12 == 0 {
                    tracing::info!(
                        base_reserve = %pool.base_reserve,
                        quote_reserve = %pool.quote_reserve,
                        amount_out = %quote.amount_out,
                        "[HEARTBEAT] pool unchanged"
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, "[QUOTE] cannot quote against current pool"),
        }
    }
}

async fn execute_once(config: &AppConfig, client: Arc<WsChainClient>, pool: &Pool) -> Result<()> {
    let key = config
        .signer_key
        .as_deref()
        .context("SIGNER_KEY is required to execute a swap")?;
    let signer = SwapSigner::from_hex(key)?;
    let quote = pool.quote(config.asset_in, config.amount_in, config.slippage)?;
    tracing::info!(
        amount_out = %quote.amount_out,
        minimum_received = %quote.minimum_received,
        signer = ?signer.address(),
        "[QUOTE] executing swap"
    );

    let executor = SwapExecutor::new(client, signer)
        .keep_alive(config.keep_alive)
        .wait_for(config.wait_for);
    let outcome = match config.submit_timeout {
        Some(limit) => tokio::time::timeout(limit, executor.execute(&quote))
            .await
            .context("timed out waiting for the swap")??,
        None => executor.execute(&quote).await?,
    };
    tracing::info!(
        received = ?outcome.receipt.event.received(),
        paid = ?outcome.receipt.event.paid(),
        block = %outcome.receipt.block_hash,
        "[SWAP] done"
    );
    Ok(())
}

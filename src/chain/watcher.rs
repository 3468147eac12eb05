use super::ChainClient;
use crate::errors::Result;
use crate::models::PoolId;
use crate::pool::Pool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Fetch the pool once, then keep refreshing it every `interval` in a
/// background task.
///
/// Refresh failures are logged and the last good snapshot stays published.
/// The task ends when every receiver is dropped.
pub async fn spawn_pool_watcher<C>(
    client: Arc<C>,
    pool_id: PoolId,
    interval: Duration,
) -> Result<(watch::Receiver<Pool>, JoinHandle<()>)>
where
    C: ChainClient + 'static,
{
    let initial = client.fetch_pool(pool_id).await?;
    let (tx, rx) = watch::channel(initial);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately and the initial fetch covers it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match client.fetch_pool(pool_id).await {
                Ok(pool) => {
                    let changed = tx.send_if_modified(|current| {
                        if *current == pool {
                            return false;
                        }
                        *current = pool;
                        true
                    });
                    if changed {
                        debug!(pool_id, "[CHAIN] pool snapshot updated");
                    }
                }
                Err(e) => {
                    warn!(error = %e, pool_id, "[CHAIN] failed to refresh pool state");
                }
            }
            if tx.is_closed() {
                break;
            }
        }
    });

    Ok((rx, handle))
}

use super::{ChainClient, SignedSwap, SubmissionTracker, SwapReceipt, TxStatus, classify_error};
use crate::errors::{ChainError, Result};
use crate::models::{PoolId, WaitFor};
use crate::pool::Pool;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const POOL_SNAPSHOT: &str = "pablo_poolSnapshot";
const SUBMIT_AND_WATCH: &str = "pablo_submitAndWatchSwap";
const SWAP_STATUS: &str = "pablo_swapStatus";

/// One incoming JSON-RPC frame: a response (with `id`) or a subscription
/// notification (with `method` and `params`).
#[derive(Debug, Deserialize)]
struct RpcFrame {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Notification>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Notification {
    subscription: Value,
    result: Value,
}

impl RpcErrorBody {
    fn into_chain_error(self) -> ChainError {
        let data = self.data.map(|data| match data {
            Value::String(text) => text,
            other => other.to_string(),
        });
        classify_error(Some(self.code), &self.message, data.as_deref())
    }
}

impl RpcFrame {
    fn into_result(self) -> Result<Value> {
        match (self.error, self.result) {
            (Some(error), _) => Err(error.into_chain_error().into()),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }

    /// Status carried by a `pablo_swapStatus` notification for `subscription`.
    fn swap_status(self, subscription: &Value) -> Option<Result<TxStatus>> {
        if self.method.as_deref() != Some(SWAP_STATUS) {
            return None;
        }
        let params = self.params?;
        if &params.subscription != subscription {
            return None;
        }
        Some(serde_json::from_value(params.result).map_err(Into::into))
    }
}

/// JSON-RPC 2.0 client for the chain's Pablo gateway.
///
/// Each call opens its own connection, so a long swap watch never blocks
/// pool refreshes.
#[derive(Debug)]
pub struct WsChainClient {
    url: Url,
    next_id: AtomicU64,
}

impl WsChainClient {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn open(&self) -> Result<WsStream> {
        let (ws, _resp) = connect_async(self.url.as_str()).await?;
        Ok(ws)
    }

    /// Sends one request and waits for the frame answering it.
    async fn call(&self, ws: &mut WsStream, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        ws.send(Message::Text(request.to_string())).await?;

        while let Some(frame) = next_frame(ws).await? {
            if frame.id == Some(id) {
                return frame.into_result();
            }
            debug!(method, "[CHAIN] skipping unrelated frame");
        }
        Err(ChainError::ConnectionClosed.into())
    }
}

/// Next JSON-RPC frame, or `None` once the server closes the socket.
async fn next_frame(ws: &mut WsStream) -> Result<Option<RpcFrame>> {
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => match serde_json::from_str::<RpcFrame>(&text) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) => warn!(error = %e, "[CHAIN] malformed JSON-RPC frame"),
            },
            Message::Close(_) => return Ok(None),
            _ => {}
        }
    }
    Ok(None)
}

impl ChainClient for WsChainClient {
    async fn fetch_pool(&self, pool_id: PoolId) -> Result<Pool> {
        let mut ws = self.open().await?;
        let result = self.call(&mut ws, POOL_SNAPSHOT, json!([pool_id])).await;
        let _ = ws.close(None).await;

        let pool: Pool = serde_json::from_value(result?)?;
        if pool.id != pool_id {
            return Err(ChainError::UnexpectedEvent(format!(
                "asked for pool {pool_id}, got pool {}",
                pool.id
            ))
            .into());
        }
        pool.validate()?;
        Ok(pool)
    }

    async fn submit_swap(&self, swap: &SignedSwap, wait_for: WaitFor) -> Result<SwapReceipt> {
        let mut ws = self.open().await?;
        let subscription = self
            .call(&mut ws, SUBMIT_AND_WATCH, json!([swap]))
            .await?;
        info!(
            pool_id = swap.call.pool_id,
            subscription = %subscription,
            "[CHAIN] swap submitted"
        );

        let mut tracker = SubmissionTracker::new(wait_for);
        let outcome: Result<SwapReceipt> = loop {
            let Some(frame) = next_frame(&mut ws).await? else {
                break Err(ChainError::ConnectionClosed.into());
            };
            let status = match frame.swap_status(&subscription) {
                Some(status) => status?,
                None => continue,
            };
            debug!(?status, "[CHAIN] swap status");
            if let Some(outcome) = tracker.on_status(status) {
                break outcome.map_err(Into::into);
            }
        };
        let _ = ws.close(None).await;
        outcome
    }
}

//! Configuration loader and application settings.

use crate::errors::{AppError, Result};
use crate::models::{AssetId, Balance, PoolId, WaitFor};
use crate::pricing::Permill;
use crate::utils::u128_string;
use std::time::Duration;
use url::Url;

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// WebSocket endpoint of the chain's JSON-RPC gateway.
    pub rpc_ws_url: Url,
    pub pool_id: PoolId,
    /// Asset sold in the quoted swap.
    pub asset_in: AssetId,
    pub amount_in: Balance,
    pub slippage: Permill,
    /// Hex secp256k1 key. Only needed to execute.
    pub signer_key: Option<String>,
    pub keep_alive: bool,
    pub wait_for: WaitFor,
    pub quote_interval: Duration,
    /// Submit one swap and exit instead of quoting forever.
    pub execute_swap: bool,
    /// Give up waiting for the chain after this long.
    pub submit_timeout: Option<Duration>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| AppError::Config(format!("Set {key}")));

        let rpc_ws_url = Url::parse(&required("RPC_WS_URL")?)?;
        let pool_id = parse_number(&required("POOL_ID")?, "POOL_ID")?;
        let asset_in = parse_balance(&required("ASSET_IN")?, "ASSET_IN")?;
        let amount_in = parse_balance(&required("AMOUNT_IN")?, "AMOUNT_IN")?;
        let slippage = Permill::from_decimal_str(&var("SLIPPAGE").unwrap_or_else(|| "0.005".into()))
            .and_then(|p| p.ensure_fraction())
            .map_err(|e| AppError::Config(format!("SLIPPAGE: {e}")))?;
        let keep_alive = var("KEEP_ALIVE")
            .map(|v| parse_flag(&v, "KEEP_ALIVE"))
            .transpose()?
            .unwrap_or(true);
        let wait_for = match var("WAIT_FOR").as_deref().map(str::trim) {
            None | Some("inBlock") | Some("in_block") => WaitFor::InBlock,
            Some("finalized") => WaitFor::Finalized,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "WAIT_FOR must be inBlock or finalized, got {other}"
                )));
            }
        };
        let quote_interval = Duration::from_secs(
            var("QUOTE_INTERVAL_SECS")
                .map(|v| parse_number(&v, "QUOTE_INTERVAL_SECS"))
                .transpose()?
                .unwrap_or(5)
                .max(1),
        );
        let execute_swap = var("EXECUTE_SWAP")
            .map(|v| parse_flag(&v, "EXECUTE_SWAP"))
            .transpose()?
            .unwrap_or(false);
        let submit_timeout = var("SUBMIT_TIMEOUT_SECS")
            .map(|v| parse_number(&v, "SUBMIT_TIMEOUT_SECS"))
            .transpose()?
            .map(Duration::from_secs);
        let signer_key = var("SIGNER_KEY");
        if execute_swap && signer_key.is_none() {
            return Err(AppError::Config("Set SIGNER_KEY to execute a swap".into()));
        }

        Ok(Self {
            rpc_ws_url,
            pool_id,
            asset_in,
            amount_in,
            slippage,
            signer_key,
            keep_alive,
            wait_for,
            quote_interval,
            execute_swap,
            submit_timeout,
        })
    }
}

fn parse_number(value: &str, key: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{key}: {e}")))
}

fn parse_balance(value: &str, key: &str) -> Result<Balance> {
    u128_string::parse(value.trim()).map_err(|e| AppError::Config(format!("{key}: {e}")))
}

fn parse_flag(value: &str, key: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(AppError::Config(format!("{key} must be a boolean, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const BASE: [(&str, &str); 4] = [
        ("RPC_WS_URL", "ws://127.0.0.1:9988"),
        ("POOL_ID", "3"),
        ("ASSET_IN", "130"),
        ("AMOUNT_IN", "1000000"),
    ];

    #[test]
    fn defaults_apply() {
        let config = load(&BASE).unwrap();
        assert_eq!(config.pool_id, 3);
        assert_eq!(config.asset_in, 130);
        assert_eq!(config.slippage, Permill::from_parts(5_000));
        assert!(config.keep_alive);
        assert_eq!(config.wait_for, WaitFor::InBlock);
        assert_eq!(config.quote_interval, Duration::from_secs(5));
        assert!(!config.execute_swap);
        assert_eq!(config.submit_timeout, None);
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("SLIPPAGE", "0.01"),
            ("KEEP_ALIVE", "false"),
            ("WAIT_FOR", "finalized"),
            ("EXECUTE_SWAP", "1"),
            ("SIGNER_KEY", "0xabc"),
            ("SUBMIT_TIMEOUT_SECS", "60"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.slippage, Permill::from_percent(1));
        assert!(!config.keep_alive);
        assert_eq!(config.wait_for, WaitFor::Finalized);
        assert!(config.execute_swap);
        assert_eq!(config.submit_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn bad_values_are_config_errors() {
        assert!(matches!(load(&BASE[1..]), Err(AppError::Config(_))));

        let mut vars = BASE.to_vec();
        vars.push(("SLIPPAGE", "1"));
        assert!(matches!(load(&vars), Err(AppError::Config(_))));

        let mut vars = BASE.to_vec();
        vars.push(("EXECUTE_SWAP", "true"));
        assert!(matches!(load(&vars), Err(AppError::Config(_))));

        let mut vars = BASE.to_vec();
        vars.push(("WAIT_FOR", "soon"));
        assert!(matches!(load(&vars), Err(AppError::Config(_))));
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures of the pure pricing and pool-simulation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("invalid amount")]
    InvalidAmount,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("rate out of domain")]
    InvalidRate,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("invariant iteration did not converge")]
    Convergence,

    #[error("asset is not part of the pool pair")]
    AssetNotInPool,

    #[error("pair must hold two distinct assets")]
    InvalidPair,

    #[error("cannot respect minimum requested")]
    CannotRespectMinimumRequested,

    #[error("operation not supported for this pool kind")]
    UnsupportedPoolKind,

    #[error("quote was made against a different pool")]
    PoolMismatch,

    #[error("sale is not in the required state")]
    InvalidSaleState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VestingError {
    #[error("vesting period is zero")]
    ZeroVestingPeriod,

    #[error("vesting period count is zero")]
    ZeroVestingPeriodCount,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("nothing to claim")]
    NothingToClaim,

    #[error("claimed amount exceeds the scheduled total")]
    ClaimedExceedsTotal,
}

/// Failures reported by the chain while submitting or watching a swap.
///
/// These are surfaced to the caller as received; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("bad origin")]
    BadOrigin,

    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("priority is too low: {0}")]
    PriorityTooLow(String),

    #[error("dispatch error {module}::{error}")]
    Dispatch { module: String, error: String },

    #[error("invalid transaction: {0}")]
    Invalid(String),

    #[error("transaction dropped")]
    Dropped,

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected event: {0}")]
    UnexpectedEvent(String),

    #[error("connection closed before the swap was acknowledged")]
    ConnectionClosed,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Wallet error: {0}")]
    Wallet(#[from] ethers::signers::WalletError),

    #[error("Serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("Vesting error: {0}")]
    Vesting(#[from] VestingError),

    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
}

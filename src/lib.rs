//! Core library for the pablo-quoter project.
//!
//! Prices swaps against snapshots of Pablo DEX pools (constant-product and
//! stable-swap), computes vesting and crowdloan claimables, and submits
//! signed swaps to the chain through its JSON-RPC gateway.

pub mod chain;
pub mod config;
pub mod errors;
pub mod models;
pub mod pool;
pub mod pricing;
pub mod rewards;
pub mod swap;
pub mod utils;
pub mod vesting;

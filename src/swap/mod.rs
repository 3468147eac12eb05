//! Quote → signed call → submission → `Swapped` event.

pub mod executor;
pub mod signer;

pub use executor::{SwapExecutor, SwapOutcome, build_call};
pub use signer::SwapSigner;

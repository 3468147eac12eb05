use crate::chain::{SignedSwap, SwapCall};
use crate::errors::Result;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;

/// secp256k1 key that authorizes swap calls.
///
/// The signature covers the JSON encoding of the call, wrapped in the
/// Ethereum signed-message prefix.
#[derive(Clone)]
pub struct SwapSigner {
    wallet: LocalWallet,
}

impl std::fmt::Debug for SwapSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapSigner")
            .field("address", &self.wallet.address())
            .finish()
    }
}

impl SwapSigner {
    /// Parses a hex private key, with or without `0x`.
    pub fn from_hex(key: &str) -> Result<Self> {
        let key = key.trim();
        let wallet: LocalWallet = key.strip_prefix("0x").unwrap_or(key).parse()?;
        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub async fn sign(&self, call: SwapCall) -> Result<SignedSwap> {
        let payload = serde_json::to_vec(&call)?;
        let signature = self.wallet.sign_message(payload).await?;
        Ok(SignedSwap {
            call,
            signer: format!("{:?}", self.address()),
            signature: format!("0x{signature}"),
        })
    }
}

// Signer capability: deterministic signing over blocks and raw messages
// The key material lives behind the trait so a hardware device can implement
// the same contract without ever exposing a private key

use sha2::{Digest, Sha256};

use crate::block::TransactionBlock;
use crate::primitives::{AccountIndex, Address, Result};
use super::keys::{KeyPair, PublicKey, Signature};

const MESSAGE_SIGN_TAG: &[u8] = b"wallet-message";

/// Digest signed for a raw message: bound to the signing account so a
/// signature for one account never verifies for another.
pub fn message_digest(address: &Address, message: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(MESSAGE_SIGN_TAG);
    hasher.update(address.key_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Verify a raw message signature against the signing account's address.
pub fn verify_message(address: &Address, message: &str, signature: &Signature) -> bool {
    let public_key = match PublicKey::from_bytes(address.key_bytes()) {
        Ok(key) => key,
        Err(_) => return false,
    };
    public_key.verify(&message_digest(address, message), signature)
}

/// Signing capability for wallet accounts.
///
/// Exactly one implementation is active per session: `SoftwareSigner` over an
/// unlocked in-memory seed, or an external hardware-device signer. Signing may
/// suspend the caller (a device round-trip) but is always deterministic.
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
    /// Public key for the account at `index`.
    async fn account_public_key(&self, index: AccountIndex) -> Result<PublicKey>;

    /// Sign the canonical digest of a state block (all fields except
    /// signature and work).
    async fn sign_block(&self, index: AccountIndex, block: &TransactionBlock) -> Result<Signature>;

    /// Sign a raw message bound to the account's address.
    async fn sign_message(&self, index: AccountIndex, message: &str) -> Result<Signature>;
}

/// Software signer over an unlocked 32-byte wallet seed.
pub struct SoftwareSigner {
    seed: [u8; 32],
}

impl SoftwareSigner {
    pub fn new(seed: [u8; 32]) -> Self {
        Self { seed }
    }

    fn key_pair(&self, index: AccountIndex) -> KeyPair {
        KeyPair::derive(&self.seed, index)
    }
}

#[async_trait::async_trait]
impl Signer for SoftwareSigner {
    async fn account_public_key(&self, index: AccountIndex) -> Result<PublicKey> {
        Ok(self.key_pair(index).public_key)
    }

    async fn sign_block(&self, index: AccountIndex, block: &TransactionBlock) -> Result<Signature> {
        let pair = self.key_pair(index);
        Ok(pair.private_key.sign(block.hash().as_bytes()))
    }

    async fn sign_message(&self, index: AccountIndex, message: &str) -> Result<Signature> {
        let pair = self.key_pair(index);
        let digest = message_digest(&pair.address(), message);
        Ok(pair.private_key.sign(&digest))
    }
}

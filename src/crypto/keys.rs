// Key management for wallet accounts
// Per-account keys are derived deterministically from a wallet seed and index

use ed25519_dalek::{Signer as _, Verifier as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::primitives::{AccountIndex, Address, Result, WalletError};

const KEY_DERIVE_TAG: &[u8] = b"account-key";

/// Ed25519 signing key for one account.
#[derive(Clone)]
pub struct PrivateKey(ed25519_dalek::SigningKey);

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        PrivateKey(ed25519_dalek::SigningKey::from_bytes(bytes))
    }

    /// Derive the account key at `index` from a 32-byte wallet seed.
    pub fn derive(seed: &[u8; 32], index: AccountIndex) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_DERIVE_TAG);
        hasher.update(seed);
        hasher.update(index.to_be_bytes());
        let secret: [u8; 32] = hasher.finalize().into();
        Self::from_bytes(&secret)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Deterministic ed25519 signature over a prepared digest.
    pub fn sign(&self, digest: &[u8]) -> Signature {
        Signature(self.0.sign(digest))
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        write!(f, "PrivateKey(..)")
    }
}

/// Ed25519 verifying key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(ed25519_dalek::VerifyingKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|e| WalletError::Signature(format!("invalid public key: {}", e)))?;
        Ok(PublicKey(key))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn address(&self) -> Address {
        Address::from_key_bytes(*self.as_bytes())
    }

    pub fn verify(&self, digest: &[u8], signature: &Signature) -> bool {
        self.0.verify(digest, &signature.0).is_ok()
    }
}

/// Detached ed25519 signature, 128 hex characters on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Signature(ed25519_dalek::Signature::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for Signature {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| WalletError::Signature(format!("bad signature encoding: {}", e)))?;
        let bytes: [u8; 64] = bytes
            .try_into()
            .map_err(|_| WalletError::Signature("signature must be 64 bytes".into()))?;
        Ok(Self::from_bytes(&bytes))
    }
}

impl serde::Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Key pair for one wallet account.
#[derive(Clone)]
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a key pair from fresh randomness.
    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::from_private_key(PrivateKey::from_bytes(&secret))
    }

    pub fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            private_key,
            public_key,
        }
    }

    /// Derive the account key pair at `index` from a wallet seed.
    pub fn derive(seed: &[u8; 32], index: AccountIndex) -> Self {
        Self::from_private_key(PrivateKey::derive(seed, index))
    }

    pub fn address(&self) -> Address {
        self.public_key.address()
    }
}

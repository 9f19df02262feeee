// Core wire primitives for the account-chain ledger
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::WalletError;

/// Balances are integers in raw, the smallest indivisible unit.
/// The ledger's total supply fits in 128 bits, so `u128` is exact.
pub type Raw = u128;

/// Account index inside a wallet seed.
pub type AccountIndex = u32;

/// 32-byte block hash, hex-encoded on the wire.
/// The all-zero value doubles as the "no frontier" / "no link" sentinel,
/// which is also what `Default` yields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHash(#[serde(with = "hex::serde")] pub [u8; 32]);

impl BlockHash {
    pub fn zero() -> Self {
        BlockHash([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        BlockHash(bytes)
    }

    pub fn from_data(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        BlockHash(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for BlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for BlockHash {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| WalletError::InvalidBlock(format!("bad block hash: {}", e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| WalletError::InvalidBlock("block hash must be 32 bytes".into()))?;
        Ok(BlockHash(bytes))
    }
}

/// Proof-of-work stamp, 16 hex characters on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkNonce(pub u64);

impl WorkNonce {
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl std::fmt::Display for WorkNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for WorkNonce {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for WorkNonce {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.len() != 16 {
            return Err(serde::de::Error::custom("work must be 16 hex characters"));
        }
        let value = u64::from_str_radix(&s, 16).map_err(serde::de::Error::custom)?;
        Ok(WorkNonce(value))
    }
}

/// Account identifier: `acct_` prefix, 64 hex chars of ed25519 public key,
/// 8 hex chars of sha-256 checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    key: [u8; 32],
}

const ADDRESS_PREFIX: &str = "acct_";
const ADDRESS_CHECK_TAG: &[u8] = b"acct-check";

impl Address {
    pub fn from_key_bytes(key: [u8; 32]) -> Self {
        Address { key }
    }

    /// Public key bytes encoded by this address.
    pub fn key_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    fn checksum(key: &[u8; 32]) -> [u8; 4] {
        let mut hasher = Sha256::new();
        hasher.update(ADDRESS_CHECK_TAG);
        hasher.update(key);
        let digest = hasher.finalize();
        [digest[0], digest[1], digest[2], digest[3]]
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}",
            ADDRESS_PREFIX,
            hex::encode(self.key),
            hex::encode(Self::checksum(&self.key))
        )
    }
}

impl std::str::FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| WalletError::InvalidAddress(format!("missing {} prefix", ADDRESS_PREFIX)))?;
        if body.len() != 72 {
            return Err(WalletError::InvalidAddress(format!(
                "expected 72 characters after prefix, got {}",
                body.len()
            )));
        }
        // Byte slicing below requires the body to be plain hex characters
        if !body.is_ascii() {
            return Err(WalletError::InvalidAddress("non-ascii characters".into()));
        }
        let key_bytes = hex::decode(&body[..64])
            .map_err(|e| WalletError::InvalidAddress(format!("bad key encoding: {}", e)))?;
        let key: [u8; 32] = key_bytes.try_into().expect("length checked above");
        let check = hex::decode(&body[64..])
            .map_err(|e| WalletError::InvalidAddress(format!("bad checksum encoding: {}", e)))?;
        if check != Self::checksum(&key) {
            return Err(WalletError::InvalidAddress("checksum mismatch".into()));
        }
        Ok(Address { key })
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde helper: `Raw` balances travel as decimal strings.
pub mod raw_string {
    use super::Raw;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Raw, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Raw, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Policy constants for the wallet core.
pub struct Policy;

impl Policy {
    /// Default threshold the local and in-memory work generators use.
    /// A work value is valid when it is >= the threshold, so the default
    /// needs ~2^16 attempts on average.
    pub const DEFAULT_WORK_DIFFICULTY: u64 = 0xffff_0000_0000_0000;

    /// Maximum receivables fetched per query.
    pub const MAX_RECEIVABLES: usize = 100;

    /// Public key of the representative used when opening an account
    /// whose owner has not picked one yet.
    pub const FALLBACK_REPRESENTATIVE_KEY: [u8; 32] = [
        0x0b, 0xa7, 0x5e, 0xed, 0x31, 0x41, 0x59, 0x26, 0x53, 0x58, 0x97, 0x93, 0x23, 0x84,
        0x62, 0x64, 0x33, 0x83, 0x27, 0x95, 0x02, 0x88, 0x41, 0x97, 0x16, 0x93, 0x99, 0x37,
        0x51, 0x05, 0x82, 0x09,
    ];
}

// State block types: one block format carrying full account state
pub mod builder;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::Signature;
use crate::primitives::{raw_string, Address, BlockHash, Raw, WorkNonce};

const BLOCK_HASH_TAG: &[u8] = b"state-block";

/// Block subtype, transmitted as a sibling of the block on the wire.
/// Determines link-field semantics: destination key for a send, source block
/// hash for a receive/open, zero sentinel for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationSubtype {
    Send,
    Receive,
    Open,
    Change,
}

impl OperationSubtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationSubtype::Send => "send",
            OperationSubtype::Receive => "receive",
            OperationSubtype::Open => "open",
            OperationSubtype::Change => "change",
        }
    }
}

impl std::fmt::Display for OperationSubtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wire block type tag. Every block on this ledger is a state block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    #[default]
    State,
}

/// A state block: the full post-transaction account state.
///
/// Immutable once signed, except for `work` which is set exactly once by
/// whichever proof-of-work strategy wins the race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBlock {
    #[serde(rename = "type", default)]
    pub block_type: BlockType,
    pub account: Address,
    pub previous: BlockHash,
    pub representative: Address,
    #[serde(with = "raw_string")]
    pub balance: Raw,
    pub link: BlockHash,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<Signature>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub work: Option<WorkNonce>,
}

impl TransactionBlock {
    /// Canonical block digest: every field except signature and work.
    /// This is both the signing payload and the block's on-chain hash.
    pub fn hash(&self) -> BlockHash {
        let mut hasher = Sha256::new();
        hasher.update(BLOCK_HASH_TAG);
        hasher.update(self.account.key_bytes());
        hasher.update(self.previous.as_bytes());
        hasher.update(self.representative.key_bytes());
        hasher.update(self.balance.to_be_bytes());
        hasher.update(self.link.as_bytes());
        BlockHash::from_bytes(hasher.finalize().into())
    }
}

/// Input for raw block signing: missing fields are filled from the freshly
/// resolved account state before the block is signed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialBlock {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub account: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub previous: Option<BlockHash>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub representative: Option<Address>,
    #[serde(with = "raw_string")]
    pub balance: Raw,
    pub link: BlockHash,
}

// Ledger-node capability: the abstract client interface the wallet core
// queries. The RPC transport behind it is supplied externally.
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::block::{OperationSubtype, TransactionBlock};
use crate::primitives::{raw_string, Address, BlockHash, Raw, Result, WorkNonce};

pub use memory::InMemoryLedger;

/// On-chain state of an account as reported by the node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(with = "raw_string")]
    pub balance: Raw,
    pub frontier: BlockHash,
    pub representative: Address,
    pub block_count: u64,
}

/// One pending incoming transfer not yet claimed by the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivablePointer {
    pub hash: BlockHash,
    #[serde(with = "raw_string")]
    pub amount_raw: Raw,
}

/// Options for a pending-receivables query.
#[derive(Debug, Clone, Copy)]
pub struct ReceivableQuery {
    /// Sort by amount, largest first.
    pub sorted: bool,
    /// Drop receivables below this amount.
    pub threshold: Raw,
}

impl Default for ReceivableQuery {
    fn default() -> Self {
        Self {
            sorted: true,
            threshold: 0,
        }
    }
}

/// Process request: the block plus its subtype as a sibling field.
/// `do_work` asks the node to stamp the block server-side; it is only set
/// for datasources that advertise the capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub subtype: OperationSubtype,
    pub block: TransactionBlock,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub do_work: Option<bool>,
}

/// Abstract ledger-node client.
#[async_trait::async_trait]
pub trait LedgerClient: Send + Sync {
    /// Account state, or `None` when the node has never seen the account.
    async fn account_info(&self, address: &Address) -> Result<Option<AccountInfo>>;

    /// Pending receivables for an account, at most `max` entries.
    async fn pending_receivables(
        &self,
        address: &Address,
        max: usize,
        query: ReceivableQuery,
    ) -> Result<Vec<ReceivablePointer>>;

    /// Server-side proof-of-work generation for `target`.
    async fn generate_work(&self, target: &BlockHash) -> Result<WorkNonce>;

    /// Best-effort cancellation of a server-side work request.
    async fn cancel_work(&self, target: &BlockHash) -> Result<()>;

    /// Submit a signed (and normally stamped) block. Returns its hash.
    async fn process(&self, request: &ProcessRequest) -> Result<BlockHash>;

    /// Whether this datasource stamps unstamped blocks itself when asked
    /// via `do_work`. A capability flag, never a datasource-name check.
    fn supports_server_side_work(&self) -> bool {
        false
    }
}

// Final pipeline stage: package the signed block with its subtype and hand
// it to the ledger capability.

use std::sync::Arc;

use tracing::debug;

use crate::block::{OperationSubtype, TransactionBlock};
use crate::ledger::{LedgerClient, ProcessRequest};
use crate::primitives::{BlockHash, Result, WalletError};

pub struct TransactionSubmitter {
    ledger: Arc<dyn LedgerClient>,
}

impl TransactionSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Submit a signed block. `do_work` is a compatibility shim for
    /// datasources that stamp unstamped blocks server-side; it is set only
    /// when the block carries no work and the datasource advertises the
    /// capability.
    pub async fn submit(
        &self,
        block: TransactionBlock,
        subtype: OperationSubtype,
    ) -> Result<BlockHash> {
        let do_work = if block.work.is_none() && self.ledger.supports_server_side_work() {
            debug!(%subtype, "no work on block, delegating to datasource");
            Some(true)
        } else {
            None
        };

        let request = ProcessRequest {
            subtype,
            block,
            do_work,
        };
        self.ledger
            .process(&request)
            .await
            .map_err(|e| WalletError::Submission(e.to_string()))
    }
}

// Sequential multi-block receive: each receive extends the frontier the
// previous one left behind, so the batch can never run concurrently.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::ledger::ReceivablePointer;
use crate::primitives::{AccountIndex, BlockHash, WalletError};
use super::TransactionService;

/// Progress and settlement events for one batch.
///
/// Per processed receivable one `Received` is emitted, then exactly one
/// terminal event (`Completed` or `Failed`) and the channel closes.
#[derive(Debug)]
pub enum BatchEvent {
    Received {
        /// Zero-based position in the batch.
        index: usize,
        total: usize,
        /// processed / total.
        fraction: f64,
        hash: BlockHash,
    },
    Completed {
        processed: usize,
    },
    Failed {
        /// Zero-based position of the receivable that failed.
        index: usize,
        error: WalletError,
    },
}

impl BatchEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchEvent::Received { .. })
    }
}

/// Receives a batch of pending transfers strictly in the given order.
///
/// On the first failure the batch halts: receivables already processed stay
/// committed on the ledger, the remainder is left untouched.
pub struct ReceivableBatchProcessor {
    service: Arc<TransactionService>,
}

impl ReceivableBatchProcessor {
    pub fn new(service: Arc<TransactionService>) -> Self {
        Self { service }
    }

    pub fn process_all(
        &self,
        index: AccountIndex,
        receivables: Vec<ReceivablePointer>,
    ) -> mpsc::Receiver<BatchEvent> {
        let (events, receiver) = mpsc::channel(receivables.len().max(1));
        let service = self.service.clone();

        tokio::spawn(async move {
            let total = receivables.len();
            info!(account = index, total, "📦 begin receivable batch");

            for (position, receivable) in receivables.iter().enumerate() {
                match service.receive(index, receivable).await {
                    Ok(hash) => {
                        let processed = position + 1;
                        let event = BatchEvent::Received {
                            index: position,
                            total,
                            fraction: processed as f64 / total as f64,
                            hash,
                        };
                        if events.send(event).await.is_err() {
                            // Caller went away; nothing left to report to
                            return;
                        }
                    }
                    Err(error) => {
                        warn!(account = index, item = position, %error,
                            "❌ batch halted on first failure");
                        let _ = events
                            .send(BatchEvent::Failed {
                                index: position,
                                error,
                            })
                            .await;
                        return;
                    }
                }
            }

            info!(account = index, total, "✅ receivable batch completed");
            let _ = events.send(BatchEvent::Completed { processed: total }).await;
        });

        receiver
    }
}

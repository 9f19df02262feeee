// Proof-of-work race: remote (server-assisted) vs local (on-device)
// generation, first success wins, loser is cancelled.
pub mod generator;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::ledger::LedgerClient;
use crate::primitives::{BlockHash, Result, WalletError, WorkNonce};
use generator::WorkGenerator;

/// Which strategy produced the accepted stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkSource {
    Local,
    Remote,
}

/// The accepted stamp. Exactly one outcome is accepted per block; the
/// losing strategy's result, if it ever arrives, is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkOutcome {
    pub work: WorkNonce,
    pub source: WorkSource,
}

/// Process-wide gate serializing local generation attempts: the device can
/// run one nonce search at a time. A mutex permit rather than a bare flag,
/// so the next attempt starts only after the previous generator actually
/// returned (halt honored), never merely after it was asked to stop.
#[derive(Clone)]
pub struct LocalWorkGate {
    slot: Arc<Mutex<()>>,
}

impl LocalWorkGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(())),
        }
    }

    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        self.slot.clone().lock_owned().await
    }
}

impl Default for LocalWorkGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Races the remote and local strategies for one work target.
pub struct WorkRace {
    ledger: Arc<dyn LedgerClient>,
    generator: Arc<dyn WorkGenerator>,
    gate: LocalWorkGate,
}

impl WorkRace {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        generator: Arc<dyn WorkGenerator>,
        gate: LocalWorkGate,
    ) -> Self {
        Self {
            ledger,
            generator,
            gate,
        }
    }

    /// Run both strategies logically concurrently and return the first
    /// success. A single strategy failing is not an error; both failing is.
    pub async fn run(&self, target: BlockHash) -> Result<WorkOutcome> {
        let halt = Arc::new(AtomicBool::new(false));
        let (local_tx, mut local_rx) = oneshot::channel();

        // The local attempt runs as its own task so the gate permit is held
        // until the generator has actually returned, even when the race is
        // already decided and this call has moved on.
        {
            let gate = self.gate.clone();
            let generator = self.generator.clone();
            let halt = halt.clone();
            tokio::spawn(async move {
                let _permit = gate.acquire().await;
                let result = generator.generate(target, halt).await;
                let _ = local_tx.send(result);
            });
        }

        let remote = self.ledger.generate_work(&target);
        tokio::pin!(remote);

        tokio::select! {
            local = &mut local_rx => {
                match local {
                    Ok(Ok(work)) => {
                        debug!(%target, "local work won the race");
                        self.cancel_remote(target);
                        Ok(WorkOutcome { work, source: WorkSource::Local })
                    }
                    Ok(Err(err)) => {
                        warn!(%target, %err, "local work failed, waiting on remote");
                        match remote.await {
                            Ok(work) => Ok(WorkOutcome { work, source: WorkSource::Remote }),
                            Err(remote_err) => Err(WalletError::WorkGeneration(format!(
                                "local: {}; remote: {}",
                                err, remote_err
                            ))),
                        }
                    }
                    Err(_) => {
                        // Local task dropped its channel without reporting
                        match remote.await {
                            Ok(work) => Ok(WorkOutcome { work, source: WorkSource::Remote }),
                            Err(remote_err) => Err(WalletError::WorkGeneration(format!(
                                "local strategy vanished; remote: {}",
                                remote_err
                            ))),
                        }
                    }
                }
            }
            remote_result = &mut remote => {
                match remote_result {
                    Ok(work) => {
                        debug!(%target, "remote work won the race");
                        halt.store(true, Ordering::SeqCst);
                        Ok(WorkOutcome { work, source: WorkSource::Remote })
                    }
                    Err(err) => {
                        warn!(%target, %err, "remote work failed, waiting on local");
                        match local_rx.await {
                            Ok(Ok(work)) => Ok(WorkOutcome { work, source: WorkSource::Local }),
                            Ok(Err(local_err)) => Err(WalletError::WorkGeneration(format!(
                                "remote: {}; local: {}",
                                err, local_err
                            ))),
                            Err(_) => Err(WalletError::WorkGeneration(format!(
                                "remote: {}; local strategy vanished",
                                err
                            ))),
                        }
                    }
                }
            }
        }
    }

    // Best-effort: the server keeps grinding otherwise, but its eventual
    // result has nowhere to land.
    fn cancel_remote(&self, target: BlockHash) {
        let ledger = self.ledger.clone();
        tokio::spawn(async move {
            if let Err(err) = ledger.cancel_work(&target).await {
                info!(%target, %err, "remote work cancel not acknowledged");
            }
        });
    }
}

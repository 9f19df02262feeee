// Transaction orchestration: each operation is a strict pipeline
// resolve -> build -> sign -> race work -> submit, with no fan-out outside
// the work race and no automatic retries.
pub mod batch;
pub mod submit;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::account::AccountStateResolver;
use crate::block::{builder::BlockBuilder, BlockType, PartialBlock, TransactionBlock};
use crate::config::WalletConfig;
use crate::crypto::{Signature, Signer};
use crate::ledger::{LedgerClient, ReceivablePointer, ReceivableQuery};
use crate::primitives::{AccountIndex, Address, BlockHash, Raw, Result};
use crate::work::{generator::CpuWorkGenerator, generator::WorkGenerator, LocalWorkGate, WorkRace};

pub use submit::TransactionSubmitter;

/// Pipeline stage of one in-flight operation. Terminal stages are final;
/// nothing is retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStage {
    Resolving,
    Building,
    Signing,
    RacingWork,
    Submitting,
    Completed,
    Failed,
}

impl std::fmt::Display for OperationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationStage::Resolving => "resolving",
            OperationStage::Building => "building",
            OperationStage::Signing => "signing",
            OperationStage::RacingWork => "racing-work",
            OperationStage::Submitting => "submitting",
            OperationStage::Completed => "completed",
            OperationStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Handles withdraw, receive and change-representative transactions, plus
/// raw block/message signing.
///
/// Every transaction must carry a proof-of-work stamp before the network
/// accepts it; each operation races the remote and local work strategies and
/// uses whichever stamp arrives first.
pub struct TransactionService {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn Signer>,
    resolver: AccountStateResolver,
    builder: BlockBuilder,
    work: WorkRace,
    submitter: TransactionSubmitter,
    config: WalletConfig,
}

impl TransactionService {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<dyn Signer>,
        config: WalletConfig,
    ) -> Self {
        let generator = Arc::new(CpuWorkGenerator::new(config.work_difficulty));
        Self::with_generator(ledger, signer, generator, LocalWorkGate::new(), config)
    }

    /// Construct with an explicit local generator and gate. The gate must be
    /// shared across every service instance in the process: the device runs
    /// one local nonce search at a time.
    pub fn with_generator(
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<dyn Signer>,
        generator: Arc<dyn WorkGenerator>,
        gate: LocalWorkGate,
        config: WalletConfig,
    ) -> Self {
        Self {
            resolver: AccountStateResolver::new(ledger.clone(), signer.clone()),
            builder: BlockBuilder::new(config.fallback_representative),
            work: WorkRace::new(ledger.clone(), generator, gate),
            submitter: TransactionSubmitter::new(ledger.clone()),
            ledger,
            signer,
            config,
        }
    }

    /// Attempt a withdrawal. On success, returns the transaction hash.
    pub async fn withdraw(
        &self,
        index: AccountIndex,
        recipient: &Address,
        amount: Raw,
    ) -> Result<BlockHash> {
        info!(account = index, %recipient, amount, "💸 begin send transaction");
        let result = async {
            debug!(stage = %OperationStage::Resolving, account = index);
            let resolved = self.resolver.resolve(index).await?;
            debug!(stage = %OperationStage::Building, account = index);
            let built = self.builder.withdraw(&resolved.state, recipient, amount)?;
            self.seal_and_submit(index, built).await
        }
        .await;
        self.finish("send", result)
    }

    /// Attempt to receive one pending transfer. Returns the hash of the
    /// received (or open) block.
    pub async fn receive(
        &self,
        index: AccountIndex,
        receivable: &ReceivablePointer,
    ) -> Result<BlockHash> {
        info!(account = index, source = %receivable.hash, amount = receivable.amount_raw,
            "📥 begin receive transaction");
        let result = async {
            debug!(stage = %OperationStage::Resolving, account = index);
            let resolved = self.resolver.resolve(index).await?;
            debug!(stage = %OperationStage::Building, account = index);
            let built = self
                .builder
                .receive(&resolved.state, &resolved.public_key, receivable)?;
            self.seal_and_submit(index, built).await
        }
        .await;
        self.finish("receive", result)
    }

    /// Attempt a change block. On success, returns the transaction hash.
    pub async fn change_representative(
        &self,
        index: AccountIndex,
        new_representative: &Address,
    ) -> Result<BlockHash> {
        info!(account = index, %new_representative, "🗳️ begin change transaction");
        let result = async {
            debug!(stage = %OperationStage::Resolving, account = index);
            let resolved = self.resolver.resolve(index).await?;
            debug!(stage = %OperationStage::Building, account = index);
            let built = self
                .builder
                .change_representative(&resolved.state, new_representative)?;
            self.seal_and_submit(index, built).await
        }
        .await;
        self.finish("change", result)
    }

    /// Not a transaction: sign a caller-supplied block, filling any missing
    /// fields from the freshly resolved account state. No work, no submit.
    pub async fn sign_block(&self, index: AccountIndex, partial: PartialBlock) -> Result<Signature> {
        let resolved = self.resolver.resolve(index).await?;
        let block = TransactionBlock {
            block_type: BlockType::State,
            account: partial.account.unwrap_or(resolved.address),
            previous: partial.previous.unwrap_or(resolved.state.frontier),
            representative: partial
                .representative
                .or(resolved.state.representative)
                .unwrap_or(self.config.fallback_representative),
            balance: partial.balance,
            link: partial.link,
            signature: None,
            work: None,
        };
        self.signer.sign_block(index, &block).await
    }

    /// Not a transaction: sign a raw message with the account's key.
    pub async fn sign_message(&self, index: AccountIndex, message: &str) -> Result<Signature> {
        self.signer.sign_message(index, message).await
    }

    /// Pending receivables for the account, largest first, filtered by the
    /// configured minimum threshold.
    pub async fn receivables(&self, index: AccountIndex) -> Result<Vec<ReceivablePointer>> {
        let address = self.signer.account_public_key(index).await?.address();
        self.ledger
            .pending_receivables(
                &address,
                self.config.receivable_page,
                ReceivableQuery {
                    sorted: true,
                    threshold: self.config.receivable_threshold,
                },
            )
            .await
    }

    // Shared pipeline tail: sign, race work, submit.
    async fn seal_and_submit(
        &self,
        index: AccountIndex,
        built: crate::block::builder::BuiltBlock,
    ) -> Result<BlockHash> {
        let mut block = built.block;

        debug!(stage = %OperationStage::Signing, account = index);
        let signature = self.signer.sign_block(index, &block).await?;
        block.signature = Some(signature);

        debug!(stage = %OperationStage::RacingWork, target = %built.work_target);
        let outcome = self.work.run(built.work_target).await?;
        debug!(source = ?outcome.source, work = %outcome.work, "work race settled");
        block.work = Some(outcome.work);

        debug!(stage = %OperationStage::Submitting, subtype = %built.subtype);
        self.submitter.submit(block, built.subtype).await
    }

    fn finish(&self, operation: &str, result: Result<BlockHash>) -> Result<BlockHash> {
        match &result {
            Ok(hash) => info!(stage = %OperationStage::Completed, %hash, "✅ completed {} transaction", operation),
            Err(err) => warn!(stage = %OperationStage::Failed, %err, "❌ {} transaction failed", operation),
        }
        result
    }
}

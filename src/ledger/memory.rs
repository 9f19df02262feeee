// In-memory ledger node double. Applies processed state blocks, tracks
// receivables, and validates frontier linkage, signatures, balance
// transitions and work stamps the way a real node would. Used by tests and
// the demo binary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use crate::block::OperationSubtype;
use crate::crypto::PublicKey;
use crate::primitives::{Address, BlockHash, Policy, Raw, Result, WalletError, WorkNonce};
use crate::work::generator::{solve, validate_work};
use super::{AccountInfo, LedgerClient, ProcessRequest, ReceivablePointer, ReceivableQuery};

#[derive(Debug, Clone)]
struct ChainAccount {
    balance: Raw,
    frontier: BlockHash,
    representative: Address,
    block_count: u64,
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Address, ChainAccount>,
    receivables: HashMap<Address, Vec<ReceivablePointer>>,
}

/// In-memory node with configurable work-endpoint behavior.
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    difficulty: u64,
    server_side_work: bool,
    remote_work_delay: Duration,
    remote_work_enabled: bool,
    work_requests: AtomicUsize,
    process_count: AtomicUsize,
    cancelled: std::sync::Mutex<Vec<BlockHash>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::with_difficulty(Policy::DEFAULT_WORK_DIFFICULTY)
    }

    pub fn with_difficulty(difficulty: u64) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::default())),
            difficulty,
            server_side_work: false,
            remote_work_delay: Duration::ZERO,
            remote_work_enabled: true,
            work_requests: AtomicUsize::new(0),
            process_count: AtomicUsize::new(0),
            cancelled: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Advertise the server-side work capability (`do_work` shim).
    pub fn server_side_work(mut self, enabled: bool) -> Self {
        self.server_side_work = enabled;
        self
    }

    /// Delay every `generate_work` response, to lose or win races on cue.
    pub fn remote_work_delay(mut self, delay: Duration) -> Self {
        self.remote_work_delay = delay;
        self
    }

    /// Make `generate_work` fail, simulating a node without a work peer.
    pub fn remote_work_enabled(mut self, enabled: bool) -> Self {
        self.remote_work_enabled = enabled;
        self
    }

    /// Credit `amount` raw to `address` as a pending receivable, as if an
    /// external account had sent it.
    pub async fn credit(&self, address: &Address, source_hash: BlockHash, amount: Raw) {
        let mut state = self.state.write().await;
        state
            .receivables
            .entry(*address)
            .or_default()
            .push(ReceivablePointer {
                hash: source_hash,
                amount_raw: amount,
            });
    }

    /// Number of `generate_work` calls observed.
    pub fn work_requests(&self) -> usize {
        self.work_requests.load(Ordering::SeqCst)
    }

    /// Number of successfully processed blocks.
    pub fn processed_blocks(&self) -> usize {
        self.process_count.load(Ordering::SeqCst)
    }

    /// Targets for which a best-effort work cancel arrived.
    pub fn cancelled_targets(&self) -> Vec<BlockHash> {
        self.cancelled.lock().unwrap().clone()
    }

    fn verify_block_signature(request: &ProcessRequest) -> Result<()> {
        let signature = request
            .block
            .signature
            .as_ref()
            .ok_or_else(|| WalletError::Ledger("block is not signed".into()))?;
        let key = PublicKey::from_bytes(request.block.account.key_bytes())
            .map_err(|_| WalletError::Ledger("account is not a valid key".into()))?;
        if !key.verify(request.block.hash().as_bytes(), signature) {
            return Err(WalletError::Ledger("bad block signature".into()));
        }
        Ok(())
    }

    fn check_work(&self, request: &ProcessRequest) -> Result<()> {
        let block = &request.block;
        let target = if block.previous.is_zero() {
            BlockHash::from_bytes(*block.account.key_bytes())
        } else {
            block.previous
        };
        match block.work {
            Some(work) => {
                if !validate_work(work, &target, self.difficulty) {
                    return Err(WalletError::Ledger("work below difficulty".into()));
                }
                Ok(())
            }
            None => {
                if request.do_work == Some(true) && self.server_side_work {
                    // Node stamps the block itself; nothing for the caller to do
                    debug!(target_hash = %target, "stamping block server-side");
                    solve(&target, self.difficulty, None)
                        .map(|_| ())
                        .ok_or_else(|| WalletError::Ledger("server-side work failed".into()))
                } else {
                    Err(WalletError::Ledger("block is missing work".into()))
                }
            }
        }
    }

    fn take_receivable(
        state: &mut LedgerState,
        address: &Address,
        link: &BlockHash,
    ) -> Result<ReceivablePointer> {
        let pending = state
            .receivables
            .get_mut(address)
            .ok_or_else(|| WalletError::Ledger("no receivables for account".into()))?;
        let position = pending
            .iter()
            .position(|r| r.hash == *link)
            .ok_or_else(|| WalletError::Ledger("receivable not found or already claimed".into()))?;
        Ok(pending.remove(position))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LedgerClient for InMemoryLedger {
    async fn account_info(&self, address: &Address) -> Result<Option<AccountInfo>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(address).map(|account| AccountInfo {
            balance: account.balance,
            frontier: account.frontier,
            representative: account.representative,
            block_count: account.block_count,
        }))
    }

    async fn pending_receivables(
        &self,
        address: &Address,
        max: usize,
        query: ReceivableQuery,
    ) -> Result<Vec<ReceivablePointer>> {
        let state = self.state.read().await;
        let mut pending: Vec<ReceivablePointer> = state
            .receivables
            .get(address)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|r| r.amount_raw >= query.threshold)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        if query.sorted {
            pending.sort_by(|a, b| b.amount_raw.cmp(&a.amount_raw));
        }
        pending.truncate(max);
        Ok(pending)
    }

    async fn generate_work(&self, target: &BlockHash) -> Result<WorkNonce> {
        self.work_requests.fetch_add(1, Ordering::SeqCst);
        if !self.remote_work_delay.is_zero() {
            tokio::time::sleep(self.remote_work_delay).await;
        }
        if !self.remote_work_enabled {
            return Err(WalletError::Ledger("work generation unavailable".into()));
        }
        solve(target, self.difficulty, None)
            .ok_or_else(|| WalletError::Ledger("work search exhausted".into()))
    }

    async fn cancel_work(&self, target: &BlockHash) -> Result<()> {
        self.cancelled.lock().unwrap().push(*target);
        Ok(())
    }

    async fn process(&self, request: &ProcessRequest) -> Result<BlockHash> {
        Self::verify_block_signature(request)?;
        self.check_work(request)?;

        let block = &request.block;
        let hash = block.hash();
        let mut state = self.state.write().await;

        match request.subtype {
            OperationSubtype::Send => {
                let account = state
                    .accounts
                    .get(&block.account)
                    .cloned()
                    .ok_or_else(|| WalletError::Ledger("account not found".into()))?;
                if block.previous != account.frontier {
                    return Err(WalletError::Ledger("fork: previous is not the frontier".into()));
                }
                if block.balance > account.balance {
                    return Err(WalletError::Ledger("send increases balance".into()));
                }
                let amount = account.balance - block.balance;
                let destination = Address::from_key_bytes(*block.link.as_bytes());
                state
                    .receivables
                    .entry(destination)
                    .or_default()
                    .push(ReceivablePointer {
                        hash,
                        amount_raw: amount,
                    });
                state.accounts.insert(
                    block.account,
                    ChainAccount {
                        balance: block.balance,
                        frontier: hash,
                        representative: block.representative,
                        block_count: account.block_count + 1,
                    },
                );
            }
            OperationSubtype::Open => {
                if state.accounts.contains_key(&block.account) {
                    return Err(WalletError::Ledger("account already opened".into()));
                }
                if !block.previous.is_zero() {
                    return Err(WalletError::Ledger("open block must have zero previous".into()));
                }
                let receivable = Self::take_receivable(&mut state, &block.account, &block.link)?;
                if block.balance != receivable.amount_raw {
                    return Err(WalletError::Ledger("open balance does not match send".into()));
                }
                state.accounts.insert(
                    block.account,
                    ChainAccount {
                        balance: block.balance,
                        frontier: hash,
                        representative: block.representative,
                        block_count: 1,
                    },
                );
            }
            OperationSubtype::Receive => {
                let account = state
                    .accounts
                    .get(&block.account)
                    .cloned()
                    .ok_or_else(|| WalletError::Ledger("account not found".into()))?;
                if block.previous != account.frontier {
                    return Err(WalletError::Ledger("fork: previous is not the frontier".into()));
                }
                let receivable = Self::take_receivable(&mut state, &block.account, &block.link)?;
                let expected = account
                    .balance
                    .checked_add(receivable.amount_raw)
                    .ok_or_else(|| WalletError::Ledger("receive overflows balance".into()))?;
                if block.balance != expected {
                    return Err(WalletError::Ledger("receive balance does not match send".into()));
                }
                state.accounts.insert(
                    block.account,
                    ChainAccount {
                        balance: block.balance,
                        frontier: hash,
                        representative: block.representative,
                        block_count: account.block_count + 1,
                    },
                );
            }
            OperationSubtype::Change => {
                let account = state
                    .accounts
                    .get(&block.account)
                    .cloned()
                    .ok_or_else(|| WalletError::Ledger("account not found".into()))?;
                if block.previous != account.frontier {
                    return Err(WalletError::Ledger("fork: previous is not the frontier".into()));
                }
                if block.balance != account.balance {
                    return Err(WalletError::Ledger("change block must not move funds".into()));
                }
                if !block.link.is_zero() {
                    return Err(WalletError::Ledger("change block link must be zero".into()));
                }
                state.accounts.insert(
                    block.account,
                    ChainAccount {
                        balance: account.balance,
                        frontier: hash,
                        representative: block.representative,
                        block_count: account.block_count + 1,
                    },
                );
            }
        }

        self.process_count.fetch_add(1, Ordering::SeqCst);
        debug!(subtype = %request.subtype, block = %hash, "processed block");
        Ok(hash)
    }

    fn supports_server_side_work(&self) -> bool {
        self.server_side_work
    }
}

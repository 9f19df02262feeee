// Wallet core configuration
use serde::{Deserialize, Serialize};

use crate::primitives::{Address, Policy, Raw};

/// Tunables for the transaction pipeline. Which signer backend is active
/// (software seed vs hardware device) is decided by the `Signer`
/// implementation injected at construction, not by a flag here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Representative written into open blocks for accounts whose owner has
    /// not picked one yet.
    pub fallback_representative: Address,
    /// Difficulty threshold for the local work generator.
    pub work_difficulty: u64,
    /// Minimum amount (raw) below which receivables are ignored.
    pub receivable_threshold: Raw,
    /// Maximum receivables fetched per query.
    pub receivable_page: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            fallback_representative: Address::from_key_bytes(Policy::FALLBACK_REPRESENTATIVE_KEY),
            work_difficulty: Policy::DEFAULT_WORK_DIFFICULTY,
            receivable_threshold: 0,
            receivable_page: Policy::MAX_RECEIVABLES,
        }
    }
}

// Account state resolution: key material plus current on-chain state for
// one account index, fetched fresh per operation and never cached.

use std::sync::Arc;

use tracing::debug;

use crate::crypto::{PublicKey, Signer};
use crate::ledger::LedgerClient;
use crate::primitives::{AccountIndex, Address, BlockHash, Raw, Result, WalletError};

/// Current chain state of one account.
#[derive(Debug, Clone)]
pub struct AccountState {
    pub index: AccountIndex,
    pub address: Address,
    pub balance: Raw,
    /// Hash of the latest confirmed block, or the zero sentinel when the
    /// account has no blocks yet.
    pub frontier: BlockHash,
    pub representative: Option<Address>,
    pub block_count: u64,
}

impl AccountState {
    /// An account is opened once it has published its first block, which
    /// always carries a representative.
    pub fn is_opened(&self) -> bool {
        self.representative.is_some()
    }
}

/// Resolved account: signing identity plus fresh chain state.
#[derive(Debug, Clone)]
pub struct ResolvedAccount {
    pub index: AccountIndex,
    pub public_key: PublicKey,
    pub address: Address,
    pub state: AccountState,
}

/// Derives the account identity through the signer capability and queries
/// the ledger for its current state.
pub struct AccountStateResolver {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn Signer>,
}

impl AccountStateResolver {
    pub fn new(ledger: Arc<dyn LedgerClient>, signer: Arc<dyn Signer>) -> Self {
        Self { ledger, signer }
    }

    pub async fn resolve(&self, index: AccountIndex) -> Result<ResolvedAccount> {
        let public_key = self
            .signer
            .account_public_key(index)
            .await
            .map_err(|e| WalletError::AccountResolution(format!("key lookup: {}", e)))?;
        let address = public_key.address();

        let info = self
            .ledger
            .account_info(&address)
            .await
            .map_err(|e| WalletError::AccountResolution(format!("account query: {}", e)))?;

        // An account the node has never seen is not an error: it simply has
        // no blocks yet.
        let state = match info {
            Some(info) => AccountState {
                index,
                address,
                balance: info.balance,
                frontier: info.frontier,
                representative: Some(info.representative),
                block_count: info.block_count,
            },
            None => {
                debug!(%address, "account not found on ledger, treating as unopened");
                AccountState {
                    index,
                    address,
                    balance: 0,
                    frontier: BlockHash::zero(),
                    representative: None,
                    block_count: 0,
                }
            }
        };

        Ok(ResolvedAccount {
            index,
            public_key,
            address,
            state,
        })
    }
}

// Pure construction of unsigned state blocks, one constructor per operation
// family. No I/O here: every invariant that can be checked locally is checked
// before any signing or work cost is incurred.

use crate::account::AccountState;
use crate::crypto::PublicKey;
use crate::ledger::ReceivablePointer;
use crate::primitives::{Address, BlockHash, Raw, Result, WalletError};
use super::{BlockType, OperationSubtype, TransactionBlock};

/// An unsigned block plus the metadata the rest of the pipeline needs:
/// the wire subtype and the hash the proof-of-work must be computed against.
#[derive(Debug, Clone)]
pub struct BuiltBlock {
    pub block: TransactionBlock,
    pub subtype: OperationSubtype,
    pub work_target: BlockHash,
}

/// Builds correctly-shaped unsigned blocks from a freshly resolved state.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    fallback_representative: Address,
}

impl BlockBuilder {
    pub fn new(fallback_representative: Address) -> Self {
        Self {
            fallback_representative,
        }
    }

    /// Send `amount` raw to `recipient`. Balance decreases, link carries the
    /// recipient's public key.
    pub fn withdraw(
        &self,
        state: &AccountState,
        recipient: &Address,
        amount: Raw,
    ) -> Result<BuiltBlock> {
        if amount > state.balance {
            return Err(WalletError::InsufficientBalance {
                available: state.balance,
                requested: amount,
            });
        }
        let representative = self.existing_representative(state, "withdraw")?;

        let block = TransactionBlock {
            block_type: BlockType::State,
            account: state.address,
            previous: state.frontier,
            representative,
            balance: state.balance - amount,
            link: BlockHash::from_bytes(*recipient.key_bytes()),
            signature: None,
            work: None,
        };
        Ok(BuiltBlock {
            block,
            subtype: OperationSubtype::Send,
            work_target: state.frontier,
        })
    }

    /// Pocket one receivable. On an unopened account this becomes an open
    /// block: zero previous, fallback representative, and the work target is
    /// the account's own public key since no frontier exists yet.
    pub fn receive(
        &self,
        state: &AccountState,
        public_key: &PublicKey,
        receivable: &ReceivablePointer,
    ) -> Result<BuiltBlock> {
        let balance = state
            .balance
            .checked_add(receivable.amount_raw)
            .ok_or_else(|| WalletError::InvalidBlock("receive overflows balance".into()))?;

        let (previous, representative, subtype, work_target) = match &state.representative {
            Some(representative) => (
                state.frontier,
                *representative,
                OperationSubtype::Receive,
                state.frontier,
            ),
            None => (
                BlockHash::zero(),
                self.fallback_representative,
                OperationSubtype::Open,
                BlockHash::from_bytes(*public_key.as_bytes()),
            ),
        };

        let block = TransactionBlock {
            block_type: BlockType::State,
            account: state.address,
            previous,
            representative,
            balance,
            link: receivable.hash,
            signature: None,
            work: None,
        };
        Ok(BuiltBlock {
            block,
            subtype,
            work_target,
        })
    }

    /// Delegate vote weight to `new_representative`. Funds are untouched:
    /// balance is carried over verbatim and the link is the zero sentinel.
    pub fn change_representative(
        &self,
        state: &AccountState,
        new_representative: &Address,
    ) -> Result<BuiltBlock> {
        self.existing_representative(state, "change representative")?;

        let block = TransactionBlock {
            block_type: BlockType::State,
            account: state.address,
            previous: state.frontier,
            representative: *new_representative,
            balance: state.balance,
            link: BlockHash::zero(),
            signature: None,
            work: None,
        };
        Ok(BuiltBlock {
            block,
            subtype: OperationSubtype::Change,
            work_target: state.frontier,
        })
    }

    // Withdraw and change both extend an existing chain; a receive is the
    // only operation valid on an unopened account.
    fn existing_representative(&self, state: &AccountState, operation: &str) -> Result<Address> {
        state.representative.ok_or_else(|| {
            WalletError::InvalidBlock(format!("cannot {} from an unopened account", operation))
        })
    }
}

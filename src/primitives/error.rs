// Error types for the wallet transaction pipeline
use thiserror::Error;

use super::primitives::Raw;

pub type Result<T> = std::result::Result<T, WalletError>;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("account resolution failed: {0}")]
    AccountResolution(String),

    #[error("insufficient balance: {available} raw available, {requested} raw requested")]
    InsufficientBalance { available: Raw, requested: Raw },

    #[error("work generation failed: {0}")]
    WorkGeneration(String),

    #[error("submission rejected: {0}")]
    Submission(String),

    #[error("signing failed: {0}")]
    Signature(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid block: {0}")]
    InvalidBlock(String),

    #[error("ledger error: {0}")]
    Ledger(String),
}

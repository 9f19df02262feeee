// Account-chain wallet transaction core
// Builds, signs, work-stamps and submits state blocks on a block-lattice ledger

// Standard Rust module structure
pub mod primitives;
pub mod crypto;
pub mod ledger;
pub mod account;
pub mod block;
pub mod work;
pub mod service;
pub mod config;

// Re-export key types for easy access
pub use primitives::{
    primitives::*,
    error::*,
};

pub use crypto::{
    PrivateKey, PublicKey, Signature, KeyPair,
    Signer, SoftwareSigner, verify_message,
};

pub use ledger::{
    LedgerClient, AccountInfo, ReceivablePointer, ReceivableQuery,
    ProcessRequest, InMemoryLedger,
};

pub use account::{AccountState, AccountStateResolver, ResolvedAccount};

pub use block::{
    TransactionBlock, PartialBlock, OperationSubtype,
    builder::{BlockBuilder, BuiltBlock},
};

pub use work::{
    WorkOutcome, WorkSource, WorkRace, LocalWorkGate,
    generator::{WorkGenerator, CpuWorkGenerator, work_value, validate_work},
};

pub use service::{
    TransactionService, TransactionSubmitter, OperationStage,
    batch::{ReceivableBatchProcessor, BatchEvent},
};

pub use config::WalletConfig;

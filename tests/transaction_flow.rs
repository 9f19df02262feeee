// End-to-end pipeline tests against the in-memory ledger double

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use account_chain_wallet::{
    verify_message, AccountState, Address, BlockBuilder, BlockHash, BuiltBlock,
    CpuWorkGenerator, InMemoryLedger, LedgerClient, PartialBlock, ReceivablePointer, Signer,
    SoftwareSigner, TransactionBlock, TransactionService, TransactionSubmitter, WalletConfig,
    WalletError, WorkGenerator,
};

// Low enough that work races settle in microseconds
const EASY_DIFFICULTY: u64 = 0x1000_0000_0000_0000;

const SEED: [u8; 32] = [13u8; 32];

fn config() -> WalletConfig {
    WalletConfig {
        work_difficulty: EASY_DIFFICULTY,
        ..WalletConfig::default()
    }
}

fn setup() -> (Arc<InMemoryLedger>, Arc<SoftwareSigner>, TransactionService) {
    let ledger = Arc::new(InMemoryLedger::with_difficulty(EASY_DIFFICULTY));
    let signer = Arc::new(SoftwareSigner::new(SEED));
    let service = TransactionService::new(ledger.clone(), signer.clone(), config());
    (ledger, signer, service)
}

async fn address_of(signer: &SoftwareSigner, index: u32) -> Address {
    signer.account_public_key(index).await.unwrap().address()
}

#[tokio::test]
async fn test_open_send_receive_change_flow() {
    let (ledger, signer, service) = setup();
    let alice = address_of(&signer, 0).await;
    let bob = address_of(&signer, 1).await;

    // Alice pockets an external transfer, opening her account
    ledger.credit(&alice, BlockHash::from_data(b"ext"), 500).await;
    let pending = service.receivables(0).await.unwrap();
    assert_eq!(pending.len(), 1);
    let open_hash = service.receive(0, &pending[0]).await.unwrap();

    let info = ledger.account_info(&alice).await.unwrap().unwrap();
    assert_eq!(info.balance, 500);
    assert_eq!(info.frontier, open_hash);
    assert_eq!(info.block_count, 1);

    // Alice sends 200 raw to Bob
    let send_hash = service.withdraw(0, &bob, 200).await.unwrap();
    let info = ledger.account_info(&alice).await.unwrap().unwrap();
    assert_eq!(info.balance, 300);
    assert_eq!(info.frontier, send_hash);

    // Bob pockets it, opening his account
    let bob_pending = service.receivables(1).await.unwrap();
    assert_eq!(bob_pending.len(), 1);
    assert_eq!(bob_pending[0].hash, send_hash);
    assert_eq!(bob_pending[0].amount_raw, 200);
    service.receive(1, &bob_pending[0]).await.unwrap();
    let info = ledger.account_info(&bob).await.unwrap().unwrap();
    assert_eq!(info.balance, 200);

    // Alice delegates her vote weight to Bob; funds untouched
    service.change_representative(0, &bob).await.unwrap();
    let info = ledger.account_info(&alice).await.unwrap().unwrap();
    assert_eq!(info.balance, 300);
    assert_eq!(info.representative, bob);
    assert_eq!(info.block_count, 3);
}

/// Signer wrapper counting block signings, to prove fail-fast paths never
/// reach the signing stage.
struct CountingSigner {
    inner: SoftwareSigner,
    block_signs: AtomicUsize,
}

#[async_trait::async_trait]
impl Signer for CountingSigner {
    async fn account_public_key(
        &self,
        index: u32,
    ) -> account_chain_wallet::Result<account_chain_wallet::PublicKey> {
        self.inner.account_public_key(index).await
    }

    async fn sign_block(
        &self,
        index: u32,
        block: &TransactionBlock,
    ) -> account_chain_wallet::Result<account_chain_wallet::Signature> {
        self.block_signs.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_block(index, block).await
    }

    async fn sign_message(
        &self,
        index: u32,
        message: &str,
    ) -> account_chain_wallet::Result<account_chain_wallet::Signature> {
        self.inner.sign_message(index, message).await
    }
}

#[tokio::test]
async fn test_insufficient_balance_fails_before_any_cost() {
    let ledger = Arc::new(InMemoryLedger::with_difficulty(EASY_DIFFICULTY));
    let signer = Arc::new(CountingSigner {
        inner: SoftwareSigner::new(SEED),
        block_signs: AtomicUsize::new(0),
    });
    let service = TransactionService::new(ledger.clone(), signer.clone(), config());
    let alice = signer.account_public_key(0).await.unwrap().address();
    let bob = signer.account_public_key(1).await.unwrap().address();

    ledger.credit(&alice, BlockHash::from_data(b"ext"), 100).await;
    let pending = service.receivables(0).await.unwrap();
    service.receive(0, &pending[0]).await.unwrap();

    let signs_before = signer.block_signs.load(Ordering::SeqCst);
    let work_before = ledger.work_requests();
    let processed_before = ledger.processed_blocks();

    let err = service.withdraw(0, &bob, 5_000).await.unwrap_err();
    assert!(matches!(
        err,
        WalletError::InsufficientBalance {
            available: 100,
            requested: 5_000
        }
    ));

    // No signing, no work race, no submission happened for the failed send
    assert_eq!(signer.block_signs.load(Ordering::SeqCst), signs_before);
    assert_eq!(ledger.work_requests(), work_before);
    assert_eq!(ledger.processed_blocks(), processed_before);
}

#[tokio::test]
async fn test_stale_frontier_rejected_at_submission() {
    let (ledger, signer, service) = setup();
    let alice = address_of(&signer, 0).await;
    let bob = address_of(&signer, 1).await;

    ledger.credit(&alice, BlockHash::from_data(b"ext"), 500).await;
    let pending = service.receivables(0).await.unwrap();
    service.receive(0, &pending[0]).await.unwrap();

    // Build a send against a frontier the ledger has moved past
    let stale_state = AccountState {
        index: 0,
        address: alice,
        balance: 500,
        frontier: BlockHash::from_data(b"stale-frontier"),
        representative: Some(bob),
        block_count: 1,
    };
    let builder = BlockBuilder::new(config().fallback_representative);
    let mut built = builder.withdraw(&stale_state, &bob, 100).unwrap();
    built.block.signature = Some(signer.sign_block(0, &built.block).await.unwrap());
    built.block.work = Some(
        CpuWorkGenerator::new(EASY_DIFFICULTY)
            .generate(
                built.work_target,
                Arc::new(std::sync::atomic::AtomicBool::new(false)),
            )
            .await
            .unwrap(),
    );

    let submitter = TransactionSubmitter::new(ledger.clone());
    let err = submitter
        .submit(built.block, built.subtype)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Submission(_)));
    assert!(err.to_string().contains("frontier"));
}

#[tokio::test]
async fn test_raw_block_sign_fills_missing_fields() {
    let (ledger, signer, service) = setup();
    let alice = address_of(&signer, 0).await;

    ledger.credit(&alice, BlockHash::from_data(b"ext"), 500).await;
    let pending = service.receivables(0).await.unwrap();
    let open_hash = service.receive(0, &pending[0]).await.unwrap();

    // Only balance and link supplied; account, previous and representative
    // come from the freshly resolved state
    let partial = PartialBlock {
        account: None,
        previous: None,
        representative: None,
        balance: 500,
        link: BlockHash::zero(),
    };
    let signature = service.sign_block(0, partial).await.unwrap();

    let info = ledger.account_info(&alice).await.unwrap().unwrap();
    let expected = TransactionBlock {
        block_type: Default::default(),
        account: alice,
        previous: open_hash,
        representative: info.representative,
        balance: 500,
        link: BlockHash::zero(),
        signature: None,
        work: None,
    };
    let public_key = signer.account_public_key(0).await.unwrap();
    assert!(public_key.verify(expected.hash().as_bytes(), &signature));
}

#[tokio::test]
async fn test_raw_message_sign_round_trip() {
    let (_ledger, signer, service) = setup();
    let alice = address_of(&signer, 0).await;
    let bob = address_of(&signer, 1).await;

    let signature = service.sign_message(0, "prove it is me").await.unwrap();
    assert!(verify_message(&alice, "prove it is me", &signature));
    assert!(!verify_message(&alice, "prove it is someone", &signature));
    assert!(!verify_message(&bob, "prove it is me", &signature));
}

// A signed but unstamped open block for the server-side work shim tests.
async fn build_unstamped(signer: &SoftwareSigner, alice: Address, fallback: Address) -> BuiltBlock {
    let state = AccountState {
        index: 0,
        address: alice,
        balance: 0,
        frontier: BlockHash::zero(),
        representative: None,
        block_count: 0,
    };
    let builder = BlockBuilder::new(fallback);
    let public_key = signer.account_public_key(0).await.unwrap();
    let receivable = ReceivablePointer {
        hash: BlockHash::from_data(b"ext"),
        amount_raw: 300,
    };
    let mut built = builder.receive(&state, &public_key, &receivable).unwrap();
    built.block.signature = Some(signer.sign_block(0, &built.block).await.unwrap());
    built
}

#[tokio::test]
async fn test_server_side_work_shim() {
    let signer = SoftwareSigner::new(SEED);
    let alice = signer.account_public_key(0).await.unwrap().address();
    let fallback = config().fallback_representative;

    // Datasource advertising the capability accepts the unstamped block
    let capable = Arc::new(
        InMemoryLedger::with_difficulty(EASY_DIFFICULTY).server_side_work(true),
    );
    capable.credit(&alice, BlockHash::from_data(b"ext"), 300).await;
    let built = build_unstamped(&signer, alice, fallback).await;
    TransactionSubmitter::new(capable.clone())
        .submit(built.block, built.subtype)
        .await
        .unwrap();

    // One without it rejects the same block
    let plain = Arc::new(InMemoryLedger::with_difficulty(EASY_DIFFICULTY));
    plain.credit(&alice, BlockHash::from_data(b"ext"), 300).await;
    let built = build_unstamped(&signer, alice, fallback).await;
    let err = TransactionSubmitter::new(plain.clone())
        .submit(built.block, built.subtype)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Submission(_)));
}

// Work race semantics: first success wins, loser cancelled, local attempts
// serialized process-wide.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use account_chain_wallet::{
    BlockHash, InMemoryLedger, LocalWorkGate, Result, WalletError, WorkGenerator, WorkNonce,
    WorkRace, WorkSource,
};

const EASY_DIFFICULTY: u64 = 0x1000_0000_0000_0000;

fn race(ledger: Arc<InMemoryLedger>, generator: Arc<dyn WorkGenerator>) -> WorkRace {
    WorkRace::new(ledger, generator, LocalWorkGate::new())
}

/// Returns a fixed nonce immediately.
struct InstantGenerator(WorkNonce);

#[async_trait::async_trait]
impl WorkGenerator for InstantGenerator {
    async fn generate(&self, _target: BlockHash, _halt: Arc<AtomicBool>) -> Result<WorkNonce> {
        Ok(self.0)
    }
}

/// Fails immediately.
struct FailingGenerator;

#[async_trait::async_trait]
impl WorkGenerator for FailingGenerator {
    async fn generate(&self, _target: BlockHash, _halt: Arc<AtomicBool>) -> Result<WorkNonce> {
        Err(WalletError::WorkGeneration("device on fire".into()))
    }
}

/// Takes `delay` to produce a nonce, checking the halt flag cooperatively.
/// Records when it honored a halt and when each attempt ran.
struct SlowGenerator {
    delay: Duration,
    halt_honored: Arc<AtomicBool>,
    runs: Arc<std::sync::Mutex<Vec<(Instant, Instant)>>>,
}

impl SlowGenerator {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            halt_honored: Arc::new(AtomicBool::new(false)),
            runs: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }
}

#[async_trait::async_trait]
impl WorkGenerator for SlowGenerator {
    async fn generate(&self, _target: BlockHash, halt: Arc<AtomicBool>) -> Result<WorkNonce> {
        let started = Instant::now();
        while started.elapsed() < self.delay {
            if halt.load(Ordering::SeqCst) {
                self.halt_honored.store(true, Ordering::SeqCst);
                self.runs.lock().unwrap().push((started, Instant::now()));
                return Err(WalletError::WorkGeneration("halted".into()));
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        self.runs.lock().unwrap().push((started, Instant::now()));
        Ok(WorkNonce(0x10ca1))
    }
}

#[tokio::test]
async fn test_local_win_is_kept_and_remote_cancelled() {
    let ledger = Arc::new(
        InMemoryLedger::with_difficulty(EASY_DIFFICULTY)
            .remote_work_delay(Duration::from_millis(300)),
    );
    let target = BlockHash::from_data(b"target");
    let outcome = race(ledger.clone(), Arc::new(InstantGenerator(WorkNonce(42))))
        .run(target)
        .await
        .unwrap();

    assert_eq!(outcome.source, WorkSource::Local);
    assert_eq!(outcome.work, WorkNonce(42));

    // A late remote result has nowhere to land; the server got a best-effort
    // cancel for the target instead
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ledger.cancelled_targets().contains(&target));
}

#[tokio::test]
async fn test_remote_win_halts_local() {
    let ledger = Arc::new(InMemoryLedger::with_difficulty(EASY_DIFFICULTY));
    let generator = Arc::new(SlowGenerator::new(Duration::from_secs(5)));
    let honored = generator.halt_honored.clone();

    let outcome = race(ledger, generator).run(BlockHash::from_data(b"t")).await.unwrap();
    assert_eq!(outcome.source, WorkSource::Remote);

    // The local generator observes the halt flag and stops
    for _ in 0..100 {
        if honored.load(Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("local generator never honored the halt flag");
}

#[tokio::test]
async fn test_local_failure_falls_back_to_remote() {
    let ledger = Arc::new(
        InMemoryLedger::with_difficulty(EASY_DIFFICULTY)
            .remote_work_delay(Duration::from_millis(50)),
    );
    let outcome = race(ledger, Arc::new(FailingGenerator))
        .run(BlockHash::from_data(b"t"))
        .await
        .unwrap();
    assert_eq!(outcome.source, WorkSource::Remote);
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_local() {
    let ledger = Arc::new(
        InMemoryLedger::with_difficulty(EASY_DIFFICULTY).remote_work_enabled(false),
    );
    let generator = Arc::new(SlowGenerator::new(Duration::from_millis(50)));
    let outcome = race(ledger, generator).run(BlockHash::from_data(b"t")).await.unwrap();
    assert_eq!(outcome.source, WorkSource::Local);
}

#[tokio::test]
async fn test_both_strategies_failing_fails_the_race() {
    let ledger = Arc::new(
        InMemoryLedger::with_difficulty(EASY_DIFFICULTY).remote_work_enabled(false),
    );
    let err = race(ledger, Arc::new(FailingGenerator))
        .run(BlockHash::from_data(b"t"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::WorkGeneration(_)));
}

#[tokio::test]
async fn test_gate_serializes_local_attempts() {
    // Remote disabled: both races must settle through the local generator,
    // which the shared gate allows to run only one at a time
    let ledger = Arc::new(
        InMemoryLedger::with_difficulty(EASY_DIFFICULTY).remote_work_enabled(false),
    );
    let generator = Arc::new(SlowGenerator::new(Duration::from_millis(60)));
    let runs = generator.runs.clone();
    let gate = LocalWorkGate::new();

    let race_a = WorkRace::new(ledger.clone(), generator.clone(), gate.clone());
    let race_b = WorkRace::new(ledger.clone(), generator.clone(), gate.clone());

    let (a, b) = tokio::join!(
        race_a.run(BlockHash::from_data(b"a")),
        race_b.run(BlockHash::from_data(b"b")),
    );
    assert_eq!(a.unwrap().source, WorkSource::Local);
    assert_eq!(b.unwrap().source, WorkSource::Local);

    let runs = runs.lock().unwrap();
    assert_eq!(runs.len(), 2);
    let (first, second) = if runs[0].0 <= runs[1].0 {
        (runs[0], runs[1])
    } else {
        (runs[1], runs[0])
    };
    // The second attempt started only after the first fully returned
    assert!(second.0 >= first.1, "local attempts overlapped");
}

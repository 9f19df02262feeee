// Local proof-of-work generation. The predicate here stands in for the
// network's real work function; only the call contract matters to the
// pipeline: a nonce whose value against the target clears the threshold.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::primitives::{BlockHash, Result, WalletError, WorkNonce};

/// Value of a nonce against a target hash. Higher is harder.
pub fn work_value(work: WorkNonce, target: &BlockHash) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(work.0.to_le_bytes());
    hasher.update(target.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().expect("sha256 digest is 32 bytes"))
}

/// A work stamp is valid when its value clears the difficulty threshold.
pub fn validate_work(work: WorkNonce, target: &BlockHash, difficulty: u64) -> bool {
    work_value(work, target) >= difficulty
}

const HALT_CHECK_INTERVAL: u64 = 4096;

/// Nonce search from a random starting point. Checks the cooperative halt
/// flag between chunks; returns `None` when halted before a nonce was found.
pub fn solve(target: &BlockHash, difficulty: u64, halt: Option<&AtomicBool>) -> Option<WorkNonce> {
    let mut nonce: u64 = rand::thread_rng().gen();
    loop {
        if let Some(halt) = halt {
            if halt.load(Ordering::SeqCst) {
                return None;
            }
        }
        for _ in 0..HALT_CHECK_INTERVAL {
            let candidate = WorkNonce(nonce);
            if work_value(candidate, target) >= difficulty {
                return Some(candidate);
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}

/// Local work-generation capability.
///
/// Implementations must honor the halt flag cooperatively: once it is set,
/// return promptly without a result. A halted attempt's output, if any, is
/// discarded by the caller.
#[async_trait::async_trait]
pub trait WorkGenerator: Send + Sync {
    async fn generate(&self, target: BlockHash, halt: Arc<AtomicBool>) -> Result<WorkNonce>;
}

/// On-device nonce search on the blocking pool.
pub struct CpuWorkGenerator {
    difficulty: u64,
}

impl CpuWorkGenerator {
    pub fn new(difficulty: u64) -> Self {
        Self { difficulty }
    }
}

#[async_trait::async_trait]
impl WorkGenerator for CpuWorkGenerator {
    async fn generate(&self, target: BlockHash, halt: Arc<AtomicBool>) -> Result<WorkNonce> {
        let difficulty = self.difficulty;
        let result = tokio::task::spawn_blocking(move || solve(&target, difficulty, Some(&halt)))
            .await
            .map_err(|e| WalletError::WorkGeneration(format!("work task failed: {}", e)))?;
        match result {
            Some(work) => {
                debug!(%target, %work, "local work found");
                Ok(work)
            }
            None => Err(WalletError::WorkGeneration(
                "halted before a nonce was found".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low enough to find a nonce in a handful of attempts
    const EASY: u64 = 0x1000_0000_0000_0000;

    #[test]
    fn test_solve_clears_difficulty() {
        let target = BlockHash::from_data(b"target");
        let work = solve(&target, EASY, None).unwrap();
        assert!(validate_work(work, &target, EASY));
        assert!(!validate_work(work, &BlockHash::from_data(b"other"), u64::MAX));
    }

    #[test]
    fn test_solve_honors_halt_flag() {
        let target = BlockHash::from_data(b"target");
        let halt = AtomicBool::new(true);
        // Impossible difficulty: only the halt flag can end the search
        assert!(solve(&target, u64::MAX, Some(&halt)).is_none());
    }

    #[tokio::test]
    async fn test_cpu_generator_reports_halt_as_error() {
        let generator = CpuWorkGenerator::new(u64::MAX);
        let halt = Arc::new(AtomicBool::new(false));
        let pending = generator.generate(BlockHash::from_data(b"t"), halt.clone());
        halt.store(true, Ordering::SeqCst);
        let err = pending.await.unwrap_err();
        assert!(matches!(err, WalletError::WorkGeneration(_)));
    }
}

use crate::blockchain::block::Block;
use crate::blockchain::ledger::{Candidate, Ledger};
use crate::error::{ChainError, Result};
use crate::miner::{mine_block, CancelToken};
use crate::transaction::Transaction;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Thread-safe handle over a [`Ledger`].
///
/// The lock is held only to snapshot the pool and to append the mined block.
/// Proof-of-work runs without it, so submissions keep flowing while a block
/// is being mined.
#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
    max_retries: u32,
}

impl SharedLedger {
    pub fn new(ledger: Ledger, max_retries: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
            max_retries: max_retries.max(1),
        }
    }

    pub fn add_transaction(&self, tx: Transaction) {
        self.inner.lock().add_transaction(tx);
    }

    /// Mines the current pool on top of the current tip.
    ///
    /// If another writer appended a block while the search ran, the stale
    /// result is discarded and the pool is snapshotted again, up to the
    /// configured number of attempts.
    pub fn mine_pending(&self, miner_address: &str, cancel: &CancelToken) -> Result<Block> {
        for attempt in 1..=self.max_retries {
            let (Candidate { block, snapshot_len }, difficulty) = {
                let ledger = self.inner.lock();
                (ledger.prepare_candidate()?, ledger.difficulty())
            };

            let mined = mine_block(block, difficulty, cancel)?;

            let mut ledger = self.inner.lock();
            match ledger.commit_candidate(mined.clone(), snapshot_len, miner_address) {
                Ok(()) => return Ok(mined),
                Err(ChainError::StaleTip) => {
                    debug!(attempt, index = mined.index, "tip moved during mining, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        warn!(attempts = self.max_retries, "giving up on mining after repeated stale tips");
        Err(ChainError::StaleTip)
    }

    pub fn resolve_fork<I>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = Vec<Block>>,
    {
        self.inner.lock().resolve_fork(candidates)
    }

    pub fn is_valid(&self) -> bool {
        self.inner.lock().is_valid()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending_len()
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.inner.lock().blocks().to_vec()
    }

    /// Runs `f` with exclusive access to the ledger.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use std::thread;

    fn shared(difficulty: u32) -> SharedLedger {
        let config = ChainConfig {
            difficulty,
            mining_reward: 1.0,
            max_mining_retries: 5,
        };
        SharedLedger::new(Ledger::new(&config).unwrap(), config.max_mining_retries)
    }

    #[test]
    fn test_concurrent_submissions_are_not_lost() {
        let ledger = shared(1);
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let tx = Transaction::new(format!("w{}", w), "sink", i as f64).unwrap();
                        ledger.add_transaction(tx);
                    }
                })
            })
            .collect();

        let cancel = CancelToken::new();
        for _ in 0..3 {
            ledger.mine_pending("miner", &cancel).unwrap();
        }
        for writer in writers {
            writer.join().unwrap();
        }
        ledger.mine_pending("miner", &cancel).unwrap();

        let blocks = ledger.blocks();
        let user_txs = blocks
            .iter()
            .flat_map(|b| b.transactions())
            .filter(|tx| !tx.is_coinbase())
            .count();
        assert_eq!(user_txs, 100);
        assert!(ledger.is_valid());
        assert_eq!(ledger.pending_len(), 1);
    }

    #[test]
    fn test_parallel_miners_keep_chain_linear() {
        let ledger = shared(1);
        let miners: Vec<_> = (0..3)
            .map(|m| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    let cancel = CancelToken::new();
                    let mut mined = 0usize;
                    for _ in 0..3 {
                        if ledger.mine_pending(&format!("m{}", m), &cancel).is_ok() {
                            mined += 1;
                        }
                    }
                    mined
                })
            })
            .collect();
        let mined: usize = miners.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(ledger.len(), 1 + mined);
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_cancelled_mining_exposes_nothing() {
        let ledger = shared(64);
        ledger.add_transaction(Transaction::new("a", "b", 1.0).unwrap());
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(ledger.mine_pending("m", &cancel), Err(ChainError::MiningCancelled));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.pending_len(), 1);
    }
}

//! Proof-of-work search.
//!
//! A block is admitted when the first `difficulty` characters of its hex
//! header digest are `'0'`. The search has no iteration cap; callers stop it
//! through a [`CancelToken`].

use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use crate::hashing::meets_difficulty;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Longest possible prefix of a SHA-256 hex digest.
pub const MAX_DIFFICULTY: u32 = 64;

/// Shared flag that aborts an in-progress search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Increments the nonce until the header digest meets `difficulty`.
///
/// Difficulty 0 accepts the block as constructed. On cancellation the block is
/// dropped and `MiningCancelled` is returned.
pub fn mine_block(mut block: Block, difficulty: u32, cancel: &CancelToken) -> Result<Block> {
    if difficulty > MAX_DIFFICULTY {
        return Err(ChainError::ConfigError(format!(
            "difficulty {} exceeds maximum {}",
            difficulty, MAX_DIFFICULTY
        )));
    }

    let started = Instant::now();
    block.hash = block.compute_hash()?;
    while !meets_difficulty(&block.hash, difficulty) {
        if cancel.is_cancelled() {
            debug!(index = block.index, nonce = block.nonce, "mining cancelled");
            return Err(ChainError::MiningCancelled);
        }
        block.nonce += 1;
        block.hash = block.compute_hash()?;
    }

    debug!(
        index = block.index,
        nonce = block.nonce,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "block mined"
    );
    Ok(block)
}

/// True when the stored hash is the recomputed header digest and meets `difficulty`.
pub fn verify_pow(block: &Block, difficulty: u32) -> bool {
    matches!(block.compute_hash(), Ok(hash) if hash == block.hash)
        && meets_difficulty(&block.hash, difficulty)
}

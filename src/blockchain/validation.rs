use crate::blockchain::block::{Block, GENESIS_PREVIOUS_HASH};
use crate::error::{ChainError, Result};
use crate::hashing::meets_difficulty;

/// Walks the chain and reports the first block that breaks an invariant.
///
/// Checks, per block: position matches `index`, stored hash equals the
/// recomputed header digest, Merkle root commits to the transactions, and
/// every transaction is well formed. For blocks after genesis it also checks
/// the link to the parent and the proof-of-work prefix.
pub fn validate_chain(blocks: &[Block], difficulty: u32) -> Result<()> {
    let genesis = blocks
        .first()
        .ok_or_else(|| ChainError::linkage(0, "chain is empty"))?;
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(ChainError::linkage(0, "genesis must point at the sentinel parent"));
    }
    if !genesis.transactions().is_empty() {
        return Err(ChainError::linkage(0, "genesis must not carry transactions"));
    }

    for (position, block) in blocks.iter().enumerate() {
        validate_block(block, position as u64)?;
    }

    for pair in blocks.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if current.previous_hash != previous.hash {
            return Err(ChainError::linkage(
                current.index,
                format!(
                    "previous_hash {} does not match parent hash {}",
                    current.previous_hash, previous.hash
                ),
            ));
        }
        if !meets_difficulty(&current.hash, difficulty) {
            return Err(ChainError::linkage(
                current.index,
                format!("hash {} does not meet difficulty {}", current.hash, difficulty),
            ));
        }
    }

    Ok(())
}

fn validate_block(block: &Block, position: u64) -> Result<()> {
    if block.index != position {
        return Err(ChainError::linkage(
            position,
            format!("block index {} stored at position {}", block.index, position),
        ));
    }

    let recomputed = block.compute_hash()?;
    if recomputed != block.hash {
        return Err(ChainError::linkage(
            position,
            format!("stored hash {} but header digests to {}", block.hash, recomputed),
        ));
    }

    let expected_root = Block::calculate_merkle_root(block.transactions())?;
    if expected_root != block.merkle_root() {
        return Err(ChainError::linkage(
            position,
            format!(
                "merkle root {} does not commit to transactions ({})",
                block.merkle_root(),
                expected_root
            ),
        ));
    }

    for tx in block.transactions() {
        tx.validate()
            .map_err(|e| ChainError::linkage(position, e.to_string()))?;
    }
    Ok(())
}

/// Boolean form of [`validate_chain`].
pub fn is_chain_valid(blocks: &[Block], difficulty: u32) -> bool {
    validate_chain(blocks, difficulty).is_ok()
}

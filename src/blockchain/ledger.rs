use crate::blockchain::block::Block;
use crate::blockchain::validation::{is_chain_valid, validate_chain};
use crate::config::ChainConfig;
use crate::error::{ChainError, Result};
use crate::miner::{mine_block, CancelToken};
use crate::transaction::Transaction;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

/// Unmined block built from a snapshot of the pending pool.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub block: Block,
    /// Number of pool entries captured in `block`, counted from the front.
    pub snapshot_len: usize,
}

/// The canonical chain plus the pool of transactions waiting for a block.
#[derive(Debug, Clone)]
pub struct Ledger {
    blocks: Vec<Block>,
    pending: VecDeque<Transaction>,
    difficulty: u32,
    mining_reward: f64,
}

impl Ledger {
    pub fn new(config: &ChainConfig) -> Result<Self> {
        config.validate()?;
        let genesis = Self::create_genesis()?;
        info!(difficulty = config.difficulty, genesis = %genesis.hash, "ledger initialised");
        Ok(Ledger {
            blocks: vec![genesis],
            pending: VecDeque::new(),
            difficulty: config.difficulty,
            mining_reward: config.mining_reward,
        })
    }

    /// Rebuilds a ledger from stored blocks, rejecting an invalid chain.
    pub fn from_blocks(blocks: Vec<Block>, config: &ChainConfig) -> Result<Self> {
        config.validate()?;
        validate_chain(&blocks, config.difficulty)?;
        Ok(Ledger {
            blocks,
            pending: VecDeque::new(),
            difficulty: config.difficulty,
            mining_reward: config.mining_reward,
        })
    }

    pub fn create_genesis() -> Result<Block> {
        Block::genesis()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true: a ledger always holds its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn latest_block(&self) -> &Block {
        // The constructors guarantee at least the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn pending(&self) -> impl Iterator<Item = &Transaction> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn mining_reward(&self) -> f64 {
        self.mining_reward
    }

    /// Queues `tx` for the next block. No balance check happens here.
    pub fn add_transaction(&mut self, tx: Transaction) {
        debug!(sender = tx.sender(), recipient = tx.recipient(), amount = tx.amount(), "transaction queued");
        self.pending.push_back(tx);
    }

    /// Snapshots the whole pool into an unmined block on top of the current tip.
    pub fn prepare_candidate(&self) -> Result<Candidate> {
        let tip = self.latest_block();
        let transactions: Vec<Transaction> = self.pending.iter().cloned().collect();
        let snapshot_len = transactions.len();
        let block = Block::new(tip.index + 1, transactions, tip.hash.clone())?;
        Ok(Candidate {
            block,
            snapshot_len,
        })
    }

    /// Appends a mined candidate and resets the pool.
    ///
    /// Fails with `StaleTip` if the chain moved since the snapshot. After the
    /// append the pool holds one coinbase for `miner_address`, followed by any
    /// transactions that arrived after the snapshot.
    pub fn commit_candidate(&mut self, block: Block, snapshot_len: usize, miner_address: &str) -> Result<()> {
        let tip = self.latest_block();
        if block.previous_hash != tip.hash || block.index != tip.index + 1 {
            return Err(ChainError::StaleTip);
        }
        if !crate::miner::verify_pow(&block, self.difficulty) {
            return Err(ChainError::linkage(block.index, "candidate does not meet difficulty"));
        }
        let coinbase = Transaction::coinbase(miner_address, self.mining_reward)?;

        let drained = snapshot_len.min(self.pending.len());
        self.pending.drain(..drained);
        self.pending.push_front(coinbase);

        info!(
            index = block.index,
            hash = %block.hash,
            transactions = block.transactions().len(),
            "block appended"
        );
        self.blocks.push(block);
        Ok(())
    }

    /// Snapshot, mine and append in one sequential flow. An empty pool still
    /// produces a block with no transactions.
    pub fn mine_pending(&mut self, miner_address: &str) -> Result<&Block> {
        self.mine_pending_with(miner_address, &CancelToken::new())
    }

    pub fn mine_pending_with(&mut self, miner_address: &str, cancel: &CancelToken) -> Result<&Block> {
        let Candidate {
            block,
            snapshot_len,
        } = self.prepare_candidate()?;
        let mined = mine_block(block, self.difficulty, cancel)?;
        self.commit_candidate(mined, snapshot_len, miner_address)?;
        Ok(self.latest_block())
    }

    pub fn is_valid(&self) -> bool {
        is_chain_valid(&self.blocks, self.difficulty)
    }

    /// Structured form of [`Ledger::is_valid`] naming the first failing block.
    pub fn validate(&self) -> Result<()> {
        validate_chain(&self.blocks, self.difficulty)
    }

    /// Longest-valid-chain fork choice.
    ///
    /// Picks the first longest candidate among those that validate, and adopts
    /// it only if it is strictly longer than the current chain. The pending
    /// pool is left untouched. Returns whether the chain was replaced.
    pub fn resolve_fork<I>(&mut self, candidates: I) -> bool
    where
        I: IntoIterator<Item = Vec<Block>>,
    {
        let mut best: Option<Vec<Block>> = None;
        for candidate in candidates {
            if let Err(e) = validate_chain(&candidate, self.difficulty) {
                debug!(length = candidate.len(), error = %e, "fork candidate rejected");
                continue;
            }
            let best_len = best.as_ref().map_or(self.blocks.len(), Vec::len);
            if candidate.len() > best_len {
                best = Some(candidate);
            }
        }

        match best {
            Some(chain) => {
                warn!(old_length = self.blocks.len(), new_length = chain.len(), "replacing chain with longer fork");
                self.blocks = chain;
                true
            }
            None => false,
        }
    }

    /// Net balance of `address` over mined blocks. Coinbase credits count,
    /// the coinbase sentinel itself is never debited.
    pub fn balance_of(&self, address: &str) -> f64 {
        self.balances().get(address).copied().unwrap_or(0.0)
    }

    pub fn balances(&self) -> HashMap<String, f64> {
        let mut balances = HashMap::new();
        for tx in self.blocks.iter().flat_map(|b| b.transactions()) {
            if !tx.is_coinbase() {
                *balances.entry(tx.sender().to_string()).or_insert(0.0) -= tx.amount();
            }
            *balances.entry(tx.recipient().to_string()).or_insert(0.0) += tx.amount();
        }
        balances
    }
}

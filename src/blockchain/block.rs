use crate::error::Result;
use crate::hashing::{hash_record, Sha256Hex};
use crate::merkle::MerkleTree;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
/// Fixed genesis timestamp (2023-01-01T00:00:00Z, milliseconds) so every node
/// derives the same genesis block.
pub const GENESIS_TIMESTAMP: u64 = 1_672_531_200_000;

/// Header digest input. Field order is the canonical order and must not change.
#[derive(Serialize)]
struct HeaderPayload<'a> {
    index: u64,
    transactions: &'a [Transaction],
    timestamp: u64,
    previous_hash: &'a str,
    nonce: u64,
    merkle_root: &'a str,
}

/// An ordered batch of transactions with its header.
///
/// The transaction list and Merkle root are fixed at construction; the rest of
/// the header stays public so mining and validation can work on it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    transactions: Vec<Transaction>,
    pub timestamp: u64,
    pub previous_hash: Sha256Hex,
    pub nonce: u64,
    merkle_root: Sha256Hex,
    pub hash: Sha256Hex,
}

impl Block {
    pub fn new(index: u64, transactions: Vec<Transaction>, previous_hash: impl Into<Sha256Hex>) -> Result<Self> {
        let timestamp = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Self::with_timestamp(index, transactions, previous_hash, timestamp)
    }

    pub fn with_timestamp(
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<Sha256Hex>,
        timestamp: u64,
    ) -> Result<Self> {
        let merkle_root = Self::calculate_merkle_root(&transactions)?;
        let mut block = Block {
            index,
            transactions,
            timestamp,
            previous_hash: previous_hash.into(),
            nonce: 0,
            merkle_root,
            hash: String::new(),
        };
        block.hash = block.compute_hash()?;
        Ok(block)
    }

    /// Block 0: no transactions, sentinel parent, hashed once without mining.
    pub fn genesis() -> Result<Self> {
        Self::with_timestamp(0, Vec::new(), GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn merkle_root(&self) -> &str {
        &self.merkle_root
    }

    pub fn calculate_merkle_root(transactions: &[Transaction]) -> Result<Sha256Hex> {
        let digests = transactions
            .iter()
            .map(Transaction::digest)
            .collect::<Result<Vec<_>>>()?;
        Ok(MerkleTree::build(&digests).root().to_string())
    }

    pub fn merkle_tree(&self) -> Result<MerkleTree> {
        let digests = self
            .transactions
            .iter()
            .map(Transaction::digest)
            .collect::<Result<Vec<_>>>()?;
        Ok(MerkleTree::build(&digests))
    }

    /// Digest of every header field except `hash`.
    pub fn compute_hash(&self) -> Result<Sha256Hex> {
        hash_record(&HeaderPayload {
            index: self.index,
            transactions: &self.transactions,
            timestamp: self.timestamp,
            previous_hash: &self.previous_hash,
            nonce: self.nonce,
            merkle_root: &self.merkle_root,
        })
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

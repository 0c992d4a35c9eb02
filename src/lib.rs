//! TallyChain - a minimal single-node proof-of-work ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Blockchain
//! - [`hashing`] - Canonical serialization and SHA-256 digests
//! - [`merkle`] - Merkle tree construction and inclusion proofs
//! - [`transaction`] - Transaction records, digests and signing
//! - [`blockchain`] - Blocks, chain validation, the ledger and fork choice
//!
//! ## Consensus
//! - [`miner`] - Cancellable proof-of-work search
//! - [`sync`] - Peer chain retrieval feeding longest-valid-chain fork choice
//!
//! ## Contracts
//! - [`contracts`] - Contract registry, token swap and staking
//!
//! ## Cryptography
//! - [`crypto`] - Signing/verification capabilities (secp256k1 adapter)
//!
//! ## Runtime & Utilities
//! - [`node`] - Async host for mining and sync loops
//! - [`persistence`] - Chain stores
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod blockchain;
pub mod hashing;
pub mod merkle;
pub mod transaction;

// ============================================================================
// Consensus
// ============================================================================
pub mod miner;
pub mod sync;

// ============================================================================
// Contracts
// ============================================================================
pub mod contracts;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Runtime & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod node;
pub mod persistence;

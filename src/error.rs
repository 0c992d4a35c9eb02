//! Error types for TallyChain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    /// A stored block failed hash recomputation, linkage, or commitment checks.
    #[error("Invalid chain linkage at block {index}: {reason}")]
    InvalidChainLinkage { index: u64, reason: String },
    #[error("Contract not found: {0}")]
    ContractNotFound(String),
    /// Business-rule rejection, not a system fault.
    #[error("Contract execution rejected: {0}")]
    ContractExecutionRejected(String),
    #[error("No proof target: {0}")]
    EmptyProofTarget(String),
    #[error("Mining cancelled")]
    MiningCancelled,
    /// The chain tip moved while a candidate block was being mined.
    #[error("Stale tip: chain advanced during mining")]
    StaleTip,
    #[error("Transaction is already signed")]
    AlreadySigned,
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl ChainError {
    pub fn linkage(index: u64, reason: impl Into<String>) -> Self {
        ChainError::InvalidChainLinkage {
            index,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

//! Configuration management for TallyChain

use crate::error::{ChainError, Result};
use crate::miner::MAX_DIFFICULTY;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChainConfig {
    /// Leading zero hex characters required of a mined block hash.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_mining_reward")]
    pub mining_reward: f64,
    /// Attempts made by a shared ledger when the tip moves during mining.
    #[serde(default = "default_max_mining_retries")]
    pub max_mining_retries: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MinerConfig {
    #[serde(default = "default_mining_enabled")]
    pub enabled: bool,
    #[serde(default = "default_beneficiary")]
    pub beneficiary_address: String,
    #[serde(default = "default_mining_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NetworkConfig {
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
            max_mining_retries: default_max_mining_retries(),
        }
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            enabled: default_mining_enabled(),
            beneficiary_address: default_beneficiary(),
            interval_ms: default_mining_interval_ms(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            sync_interval_ms: default_sync_interval_ms(),
        }
    }
}

fn default_difficulty() -> u32 {
    2
}

fn default_mining_reward() -> f64 {
    1.0
}

fn default_max_mining_retries() -> u32 {
    3
}

fn default_mining_enabled() -> bool {
    false
}

fn default_beneficiary() -> String {
    "miner".to_string()
}

fn default_mining_interval_ms() -> u64 {
    1_000
}

fn default_sync_interval_ms() -> u64 {
    5_000
}

impl Config {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Config = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.chain.validate()?;
        if self.miner.beneficiary_address.is_empty() {
            return Err(ChainError::ConfigError(
                "miner.beneficiary_address must be set".to_string(),
            ));
        }
        Ok(())
    }
}

impl ChainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "chain.difficulty must be at most {}, got {}",
                MAX_DIFFICULTY, self.difficulty
            )));
        }
        if !self.mining_reward.is_finite() || self.mining_reward < 0.0 {
            return Err(ChainError::ConfigError(format!(
                "chain.mining_reward must be a finite non-negative number, got {}",
                self.mining_reward
            )));
        }
        Ok(())
    }
}

/// Reads `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    Config::from_toml_str(&fs::read_to_string(path)?)
}

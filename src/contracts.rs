//! Contract engine: a registry of named state-transition functions.
//!
//! Contracts run against an [`ExecutionContext`] owned by the caller. The
//! engine never stores or persists the context; a contract either applies its
//! whole transition to the context or leaves it untouched.

pub mod staking;
pub mod token_swap;

pub use staking::{StakeRecord, Staking, STAKED_BUCKET, UNSTAKED_BUCKET};
pub use token_swap::TokenSwap;

use crate::error::{ChainError, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Caller-owned input and balance sheet for one contract call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    pub address: String,
    pub token: String,
    pub amount: f64,
    /// Contract-specific verb, e.g. `"stake"` or `"unstake"`.
    pub action: Option<String>,
    /// Caller-supplied clock, in seconds.
    pub timestamp: u64,
    pub balances: BTreeMap<String, f64>,
}

impl ExecutionContext {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, amount: f64) -> Self {
        self.token = token.into();
        self.amount = amount;
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_balance(mut self, bucket: impl Into<String>, amount: f64) -> Self {
        self.balances.insert(bucket.into(), amount);
        self
    }

    pub fn balance(&self, bucket: &str) -> f64 {
        self.balances.get(bucket).copied().unwrap_or(0.0)
    }

    /// Rejects amounts that are negative or not finite.
    pub(crate) fn checked_amount(&self) -> Result<f64> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(ChainError::ContractExecutionRejected(format!(
                "amount must be a finite non-negative number, got {}",
                self.amount
            )));
        }
        Ok(self.amount)
    }
}

/// A deterministic state transition over an [`ExecutionContext`].
///
/// On `Err` the context must be exactly as it was passed in.
pub trait Contract: Send {
    fn kind(&self) -> &'static str;
    fn execute(&mut self, ctx: &mut ExecutionContext) -> Result<()>;
}

#[derive(Default)]
pub struct ContractEngine {
    contracts: HashMap<String, Box<dyn Contract>>,
}

impl ContractEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `contract` under `name`, replacing any previous deployment.
    pub fn deploy(&mut self, name: impl Into<String>, contract: Box<dyn Contract>) {
        let name = name.into();
        info!(name = %name, kind = contract.kind(), "contract deployed");
        self.contracts.insert(name, contract);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.contracts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn try_execute(&mut self, name: &str, ctx: &mut ExecutionContext) -> Result<()> {
        let contract = self
            .contracts
            .get_mut(name)
            .ok_or_else(|| ChainError::ContractNotFound(name.to_string()))?;
        contract.execute(ctx)
    }

    /// Boolean form of [`ContractEngine::try_execute`]: rejections and unknown
    /// names both come back as `false`.
    pub fn execute(&mut self, name: &str, ctx: &mut ExecutionContext) -> bool {
        match self.try_execute(name, ctx) {
            Ok(()) => true,
            Err(e) => {
                debug!(contract = name, error = %e, "contract call failed");
                false
            }
        }
    }
}

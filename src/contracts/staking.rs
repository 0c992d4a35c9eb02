use crate::contracts::{Contract, ExecutionContext};
use crate::error::{ChainError, Result};
use std::collections::HashMap;

/// Balance bucket holding principal that is currently locked.
pub const STAKED_BUCKET: &str = "staked";
/// Balance bucket receiving principal plus reward on release.
pub const UNSTAKED_BUCKET: &str = "unstaked";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakeRecord {
    pub amount: f64,
    pub timestamp: u64,
}

/// Time-locked staking with a flat reward.
///
/// `stake` moves `amount` of the context token into [`STAKED_BUCKET`] and
/// records it for the context address. A new stake replaces any earlier
/// unresolved record for the same address. `unstake` succeeds once at least
/// `period` seconds have passed since the stake, paying
/// `amount * (1 + reward_rate)` into [`UNSTAKED_BUCKET`].
#[derive(Debug, Clone, Default)]
pub struct Staking {
    pub period: u64,
    pub reward_rate: f64,
    stakes: HashMap<String, StakeRecord>,
}

impl Staking {
    pub fn new(period: u64, reward_rate: f64) -> Result<Self> {
        if !reward_rate.is_finite() || reward_rate < 0.0 {
            return Err(ChainError::ConfigError(format!(
                "reward rate must be finite and non-negative, got {}",
                reward_rate
            )));
        }
        Ok(Self {
            period,
            reward_rate,
            stakes: HashMap::new(),
        })
    }

    pub fn stake_of(&self, address: &str) -> Option<StakeRecord> {
        self.stakes.get(address).copied()
    }

    fn stake(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let amount = ctx.checked_amount()?;
        if ctx.token == STAKED_BUCKET || ctx.token == UNSTAKED_BUCKET {
            return Err(ChainError::ContractExecutionRejected(format!(
                "token {:?} is reserved for staking balances",
                ctx.token
            )));
        }
        let available = ctx.balance(&ctx.token);
        if available < amount {
            return Err(ChainError::ContractExecutionRejected(format!(
                "insufficient {} balance to stake: have {}, need {}",
                ctx.token, available, amount
            )));
        }

        let staked = ctx.balance(STAKED_BUCKET) + amount;
        ctx.balances.insert(ctx.token.clone(), available - amount);
        ctx.balances.insert(STAKED_BUCKET.to_string(), staked);
        self.stakes.insert(
            ctx.address.clone(),
            StakeRecord {
                amount,
                timestamp: ctx.timestamp,
            },
        );
        Ok(())
    }

    fn unstake(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let record = self.stake_of(&ctx.address).ok_or_else(|| {
            ChainError::ContractExecutionRejected(format!("no stake recorded for {}", ctx.address))
        })?;

        let elapsed = ctx.timestamp.saturating_sub(record.timestamp);
        if ctx.timestamp < record.timestamp || elapsed < self.period {
            return Err(ChainError::ContractExecutionRejected(format!(
                "stake locked: {} of {} seconds elapsed",
                elapsed, self.period
            )));
        }

        let locked = ctx.balance(STAKED_BUCKET);
        if locked < record.amount {
            return Err(ChainError::ContractExecutionRejected(format!(
                "staked balance {} does not cover recorded stake {}",
                locked, record.amount
            )));
        }

        let payout = record.amount + record.amount * self.reward_rate;
        let unstaked = ctx.balance(UNSTAKED_BUCKET) + payout;
        let staked = locked - record.amount;
        ctx.balances.insert(UNSTAKED_BUCKET.to_string(), unstaked);
        ctx.balances.insert(STAKED_BUCKET.to_string(), staked);
        self.stakes.remove(&ctx.address);
        Ok(())
    }
}

impl Contract for Staking {
    fn kind(&self) -> &'static str {
        "staking"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        match ctx.action.as_deref() {
            Some("stake") => self.stake(ctx),
            Some("unstake") => self.unstake(ctx),
            other => Err(ChainError::ContractExecutionRejected(format!(
                "unsupported staking action {:?}",
                other
            ))),
        }
    }
}

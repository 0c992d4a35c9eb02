use crate::contracts::{Contract, ExecutionContext};
use crate::error::{ChainError, Result};

/// Fixed-rate exchange between two tokens.
///
/// Paying `amount` of `token_a` yields `amount * rate` of `token_b`; paying
/// `token_b` yields `amount / rate` of `token_a`.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSwap {
    pub token_a: String,
    pub token_b: String,
    pub rate: f64,
}

impl TokenSwap {
    pub fn new(token_a: impl Into<String>, token_b: impl Into<String>, rate: f64) -> Result<Self> {
        let (token_a, token_b) = (token_a.into(), token_b.into());
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ChainError::ConfigError(format!(
                "swap rate must be finite and positive, got {}",
                rate
            )));
        }
        if token_a == token_b {
            return Err(ChainError::ConfigError(format!(
                "swap pair needs two distinct tokens, got {} twice",
                token_a
            )));
        }
        Ok(Self {
            token_a,
            token_b,
            rate,
        })
    }

    /// Source token, target token and the amount credited for `amount` paid.
    fn quote(&self, token: &str, amount: f64) -> Result<(&str, &str, f64)> {
        if token == self.token_a {
            Ok((&self.token_a, &self.token_b, amount * self.rate))
        } else if token == self.token_b {
            Ok((&self.token_b, &self.token_a, amount / self.rate))
        } else {
            Err(ChainError::ContractExecutionRejected(format!(
                "token {:?} is not part of the {}/{} pair",
                token, self.token_a, self.token_b
            )))
        }
    }
}

impl Contract for TokenSwap {
    fn kind(&self) -> &'static str {
        "token_swap"
    }

    fn execute(&mut self, ctx: &mut ExecutionContext) -> Result<()> {
        let amount = ctx.checked_amount()?;
        let (source, target, credit) = self.quote(&ctx.token, amount)?;

        let available = ctx.balance(source);
        if available < amount {
            return Err(ChainError::ContractExecutionRejected(format!(
                "insufficient {} balance: have {}, need {}",
                source, available, amount
            )));
        }

        let debited = available - amount;
        let credited = ctx.balance(target) + credit;
        ctx.balances.insert(source.to_string(), debited);
        ctx.balances.insert(target.to_string(), credited);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap() -> TokenSwap {
        TokenSwap::new("A", "B", 2.0).unwrap()
    }

    #[test]
    fn test_forward_swap_debits_and_credits() {
        let mut ctx = ExecutionContext::new("alice")
            .with_token("A", 10.0)
            .with_balance("A", 100.0);
        swap().execute(&mut ctx).unwrap();
        assert_eq!(ctx.balance("A"), 90.0);
        assert_eq!(ctx.balance("B"), 20.0);
    }

    #[test]
    fn test_reverse_swap_uses_inverse_rate() {
        let mut ctx = ExecutionContext::new("alice")
            .with_token("B", 20.0)
            .with_balance("B", 20.0);
        swap().execute(&mut ctx).unwrap();
        assert_eq!(ctx.balance("B"), 0.0);
        assert_eq!(ctx.balance("A"), 10.0);
    }

    #[test]
    fn test_foreign_token_rejected_without_mutation() {
        let mut ctx = ExecutionContext::new("alice")
            .with_token("C", 1.0)
            .with_balance("C", 5.0);
        let before = ctx.clone();
        assert!(matches!(
            swap().execute(&mut ctx),
            Err(ChainError::ContractExecutionRejected(_))
        ));
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_insufficient_balance_rejected_without_mutation() {
        let mut ctx = ExecutionContext::new("alice")
            .with_token("A", 10.0)
            .with_balance("A", 3.0);
        let before = ctx.clone();
        assert!(swap().execute(&mut ctx).is_err());
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut ctx = ExecutionContext::new("alice")
            .with_token("A", -1.0)
            .with_balance("A", 3.0);
        assert!(swap().execute(&mut ctx).is_err());
    }

    #[test]
    fn test_invalid_rate_rejected() {
        assert!(TokenSwap::new("A", "B", 0.0).is_err());
        assert!(TokenSwap::new("A", "B", f64::INFINITY).is_err());
        assert!(matches!(
            TokenSwap::new("A", "B", -2.0),
            Err(ChainError::ConfigError(_))
        ));
    }

    #[test]
    fn test_same_token_pair_rejected() {
        assert!(matches!(
            TokenSwap::new("A", "A", 2.0),
            Err(ChainError::ConfigError(_))
        ));
    }
}

/// Transaction types for TallyChain
use crate::crypto::{Address, Signer};
use crate::error::{ChainError, Result};
use crate::hashing::{hash_record, Sha256Hex};
use serde::{Deserialize, Serialize};

/// Sender used by minted reward transactions.
pub const COINBASE_SENDER: &str = "COINBASE";

/// A value transfer. The signature is stored as hex and excluded from
/// [`Transaction::digest`].
///
/// Field order here is the canonical order used when a transaction is hashed
/// as part of a block header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    sender: Address,
    recipient: Address,
    amount: f64,
    #[serde(default)]
    signature: String,
}

/// Signed payload: `sender`, `recipient`, `amount`, in that order.
#[derive(Serialize)]
struct SigningPayload<'a> {
    sender: &'a str,
    recipient: &'a str,
    amount: f64,
}

impl Transaction {
    pub fn new(sender: impl Into<Address>, recipient: impl Into<Address>, amount: f64) -> Result<Self> {
        Self::check_amount(amount)?;
        Ok(Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            signature: String::new(),
        })
    }

    /// Reward minted to `recipient`. Coinbase transactions are never signed.
    pub fn coinbase(recipient: impl Into<Address>, reward: f64) -> Result<Self> {
        Self::new(COINBASE_SENDER, recipient, reward)
    }

    pub(crate) fn check_amount(amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ChainError::InvalidTransaction(format!(
                "amount must be a finite non-negative number, got {}",
                amount
            )));
        }
        Ok(())
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Hex-encoded signature, empty when unsigned.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENDER
    }

    pub fn digest(&self) -> Result<Sha256Hex> {
        hash_record(&SigningPayload {
            sender: &self.sender,
            recipient: &self.recipient,
            amount: self.amount,
        })
    }

    pub fn set_recipient(&mut self, recipient: impl Into<Address>) -> Result<()> {
        self.ensure_unsigned()?;
        self.recipient = recipient.into();
        Ok(())
    }

    pub fn set_amount(&mut self, amount: f64) -> Result<()> {
        self.ensure_unsigned()?;
        Self::check_amount(amount)?;
        self.amount = amount;
        Ok(())
    }

    /// Signs the digest once. Any later attempt fails with `AlreadySigned`.
    pub fn sign(&mut self, signer: &dyn Signer) -> Result<()> {
        self.ensure_unsigned()?;
        let signature = signer.sign(&self.digest()?)?;
        self.signature = hex::encode(signature);
        Ok(())
    }

    fn ensure_unsigned(&self) -> Result<()> {
        if self.is_signed() {
            return Err(ChainError::AlreadySigned);
        }
        Ok(())
    }
}

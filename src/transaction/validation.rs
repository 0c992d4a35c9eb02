/// Stateless checks for transactions. Balance sufficiency is not checked here.
use crate::crypto::Verifier;
use crate::error::{ChainError, Result};
use crate::transaction::types::Transaction;

impl Transaction {
    /// Checks the signature with an external verifier. Unsigned transactions and
    /// malformed hex never verify.
    pub fn verify(&self, verifier: &dyn Verifier, public_key: &[u8]) -> bool {
        if !self.is_signed() {
            return false;
        }
        let (Ok(signature), Ok(digest)) = (hex::decode(self.signature()), self.digest()) else {
            return false;
        };
        verifier.verify(&signature, &digest, public_key)
    }

    /// Structural validity of a record received from elsewhere (e.g. a peer chain).
    pub fn validate(&self) -> Result<()> {
        Self::check_amount(self.amount())?;
        if self.recipient().is_empty() {
            return Err(ChainError::InvalidTransaction(
                "recipient address cannot be empty".to_string(),
            ));
        }
        if self.sender().is_empty() {
            return Err(ChainError::InvalidTransaction(
                "sender address cannot be empty".to_string(),
            ));
        }
        if self.is_coinbase() && self.is_signed() {
            return Err(ChainError::InvalidTransaction(
                "coinbase transactions carry no signature".to_string(),
            ));
        }
        Ok(())
    }
}

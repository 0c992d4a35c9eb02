//! Signing capabilities consumed by the ledger, plus a secp256k1 adapter.
//!
//! The ledger core never generates or checks signatures on its own; it only
//! talks to the [`Signer`] and [`Verifier`] traits. Addresses are opaque strings.

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Opaque account identity.
pub type Address = String;

/// Produces signature bytes over a transaction digest.
pub trait Signer {
    fn sign(&self, digest: &str) -> Result<Vec<u8>, ChainError>;
}

/// Checks signature bytes against a digest and a public key.
pub trait Verifier {
    fn verify(&self, signature: &[u8], digest: &str, public_key: &[u8]) -> bool;
}

/// Hashes an arbitrary label into an address. Useful for tests and fixtures.
pub fn address_from_string(s: &str) -> Address {
    hex::encode(Sha256::digest(s.as_bytes()))
}

fn digest_message(digest: &str) -> Message {
    let hashed: [u8; 32] = Sha256::digest(digest.as_bytes()).into();
    Message::from_digest(hashed)
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes)
            .map_err(|e| ChainError::CryptoError(format!("Invalid secret key bytes: {}", e)))?;
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Hex SHA-256 of the compressed public key.
    pub fn address(&self) -> Address {
        hex::encode(Sha256::digest(self.public_key.serialize()))
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }
}

impl Signer for KeyPair {
    fn sign(&self, digest: &str) -> Result<Vec<u8>, ChainError> {
        let message = digest_message(digest);
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact().to_vec())
    }
}

/// ECDSA verification over compressed secp256k1 keys and compact signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Verifier;

impl Verifier for Secp256k1Verifier {
    fn verify(&self, signature: &[u8], digest: &str, public_key: &[u8]) -> bool {
        if public_key.len() != PUBLIC_KEY_SIZE || signature.len() != COMPACT_SIGNATURE_SIZE {
            return false;
        }
        let (Ok(public_key), Ok(signature)) = (
            PublicKey::from_slice(public_key),
            Signature::from_compact(signature),
        ) else {
            return false;
        };
        SECP256K1_CONTEXT
            .verify_ecdsa(&digest_message(digest), &signature, &public_key)
            .is_ok()
    }
}

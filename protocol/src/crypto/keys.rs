//! # Key Management
//!
//! Ed25519 keypairs for sender accounts.
//!
//! A sender's account address is the hex encoding of its 32-byte public key,
//! and its private key is the hex encoding of the 32-byte secret seed. Both
//! come from the config file; `txpulse keygen` produces fresh pairs.
//!
//! Key bytes are never logged. If you add logging to this module, log the
//! public half only.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during key operations.
///
/// These are intentionally vague about *why* something failed. Echoing key
/// material back in an error message is how secrets end up in log files.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key: expected {SECRET_KEY_LENGTH} hex-encoded bytes")]
    InvalidSecretKey,

    #[error("invalid public key: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// An account keypair wrapping an Ed25519 signing key.
///
/// `AccountKeypair` intentionally does NOT implement `Serialize`. Exporting
/// the secret goes through [`secret_key_hex`](Self::secret_key_hex) and
/// nothing else.
///
/// # Examples
///
/// ```
/// use txpulse_protocol::crypto::keys::AccountKeypair;
///
/// let kp = AccountKeypair::generate();
/// let sig = kp.sign(b"1:alice:bob:10:1:5:{}");
/// assert!(kp.verify(b"1:alice:bob:10:1:5:{}", &sig));
/// ```
pub struct AccountKeypair {
    signing_key: SigningKey,
}

impl AccountKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Constructs a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded secret seed, the form used in
    /// sender entries of the config file.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Raw public key bytes. This is the account identity on the ledger.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The account address: lowercase hex of the public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Exports the secret seed as hex.
    ///
    /// **Handle with care.** Only `txpulse keygen` should ever call this.
    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Sign a message. Ed25519 is deterministic: the same key and message
    /// always produce the same 64 bytes.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        self.signing_key
            .verifying_key()
            .verify(message, &DalekSignature::from_bytes(signature))
            .is_ok()
    }
}

impl fmt::Debug for AccountKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material, not even partially.
        write!(f, "AccountKeypair(pub={})", self.public_key_hex())
    }
}

/// Parse a hex-encoded public key into a dalek `VerifyingKey`.
pub fn verifying_key_from_hex(hex_str: &str) -> Result<VerifyingKey, KeyError> {
    let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidPublicKey)?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::InvalidPublicKey)?;
    VerifyingKey::from_bytes(&arr).map_err(|_| KeyError::InvalidPublicKey)
}

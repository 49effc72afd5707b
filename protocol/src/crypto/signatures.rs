//! # Digital Signatures
//!
//! Signing is an injected capability. The codec only decides *what* gets
//! signed (the hex digest of the canonical preimage); the [`Signer`] decides
//! *how*. Ledgers with a different signature scheme plug in their own
//! implementation without touching the codec or the pipeline.
//!
//! [`Ed25519Signer`] is the default: the private key is a hex-encoded 32-byte
//! seed, the signed message is the ASCII digest string, and the signature is
//! 128 lowercase hex characters.

use ed25519_dalek::{Signature as DalekSignature, Verifier};
use thiserror::Error;

use super::keys::{verifying_key_from_hex, AccountKeypair, KeyError};

/// Errors during signature operations.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("malformed private key: {0}")]
    MalformedKey(#[from] KeyError),
}

/// Produces a signature string over a transaction digest.
///
/// Implementations must be usable from the generator task and from faucet
/// request tasks at the same time.
pub trait Signer: Send + Sync {
    /// Sign `digest` (lowercase hex) with `private_key` as stored in config.
    fn sign(&self, private_key: &str, digest: &str) -> Result<String, SignError>;
}

/// Ed25519 over the ASCII bytes of the digest.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Signer;

impl Ed25519Signer {
    /// Verify a signature produced by [`Signer::sign`].
    ///
    /// Returns `false` for malformed keys or signatures rather than erroring.
    /// Callers only want a yes/no answer.
    pub fn verify(public_key: &str, digest: &str, signature: &str) -> bool {
        let Ok(verifying_key) = verifying_key_from_hex(public_key) else {
            return false;
        };
        let Ok(sig_bytes) = hex::decode(signature) else {
            return false;
        };
        let Ok(sig_arr) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
            return false;
        };
        verifying_key
            .verify(digest.as_bytes(), &DalekSignature::from_bytes(&sig_arr))
            .is_ok()
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, private_key: &str, digest: &str) -> Result<String, SignError> {
        let keypair = AccountKeypair::from_hex(private_key)?;
        Ok(hex::encode(keypair.sign(digest.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let kp = AccountKeypair::generate();
        let sig = Ed25519Signer
            .sign(&kp.secret_key_hex(), "deadbeef")
            .unwrap();
        assert_eq!(sig.len(), 128);
        assert!(Ed25519Signer::verify(&kp.public_key_hex(), "deadbeef", &sig));
    }

    #[test]
    fn test_wrong_digest_fails() {
        let kp = AccountKeypair::generate();
        let sig = Ed25519Signer.sign(&kp.secret_key_hex(), "aaaa").unwrap();
        assert!(!Ed25519Signer::verify(&kp.public_key_hex(), "bbbb", &sig));
    }

    #[test]
    fn test_wrong_key_fails() {
        let kp1 = AccountKeypair::generate();
        let kp2 = AccountKeypair::generate();
        let sig = Ed25519Signer.sign(&kp1.secret_key_hex(), "aaaa").unwrap();
        assert!(!Ed25519Signer::verify(&kp2.public_key_hex(), "aaaa", &sig));
    }

    #[test]
    fn test_malformed_private_key_is_an_error() {
        let err = Ed25519Signer.sign("definitely-not-hex", "aaaa").unwrap_err();
        assert!(matches!(err, SignError::MalformedKey(_)));
    }

    #[test]
    fn test_verify_tolerates_garbage() {
        assert!(!Ed25519Signer::verify("zz", "aaaa", "00"));
        let kp = AccountKeypair::generate();
        assert!(!Ed25519Signer::verify(&kp.public_key_hex(), "aaaa", "00"));
    }

    #[test]
    fn test_deterministic_signatures() {
        let kp = AccountKeypair::from_seed(&[9u8; 32]);
        let a = Ed25519Signer.sign(&kp.secret_key_hex(), "digest").unwrap();
        let b = Ed25519Signer.sign(&kp.secret_key_hex(), "digest").unwrap();
        assert_eq!(a, b);
    }
}

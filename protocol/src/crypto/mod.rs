//! # Cryptographic Primitives
//!
//! Thin wrappers around audited implementations:
//!
//! - **BLAKE3** for transaction digests.
//! - **Ed25519** for the default [`Signer`].
//!
//! Nothing here is hand-rolled. If you are tempted to optimize these
//! functions, please reconsider.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, blake3_hex};
pub use keys::{AccountKeypair, KeyError};
pub use signatures::{Ed25519Signer, SignError, Signer};

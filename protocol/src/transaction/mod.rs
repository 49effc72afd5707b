//! # Transaction Codec
//!
//! Construction, canonical hashing, and signing of ledger transfers.
//!
//! ```text
//! payload.rs Payload object and its canonical JSON form
//! types.rs   The signed Transaction record, preimage and hash
//! builder.rs build_transaction and recipient selection
//! ```
//!
//! ## Hash construction
//!
//! The preimage is the colon-joined `v:from:to:amount:fee:nonce:payload`
//! with base-10 integers and canonical payload JSON. The digest is BLAKE3-256
//! in lowercase hex, and the signer signs that hex string. The node rebuilds
//! the same preimage to check the signature, so any change here is a
//! wire-breaking change.

pub mod builder;
pub mod payload;
pub mod types;

pub use builder::{build_transaction, pick_recipient, BuildError};
pub use payload::Payload;
pub use types::{Transaction, DEFAULT_TX_VERSION};

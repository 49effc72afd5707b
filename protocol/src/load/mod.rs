//! # Load Issuance
//!
//! - **issuer**: the Reserve → Build → Submit → Resolve pipeline.
//! - **generator**: one tick of the periodic load generator.
//!
//! The faucet HTTP endpoint in the binary calls [`Issuer::issue`] directly.

pub mod generator;
pub mod issuer;

pub use generator::{LoadGenerator, TickReport, TxOutcome};
pub use issuer::{IssueError, Issuer, Origin, Receipt, Recipient};

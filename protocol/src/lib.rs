// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # txpulse Core Library
//!
//! Synthetic transaction load for a ledger node's HTTP API. Periodically
//! builds, signs and submits transfers for a set of configured accounts, and
//! backs an on-demand faucet that issues transfers outside the schedule.
//!
//! ## Architecture
//!
//! - **crypto**: BLAKE3 digests and the injectable [`Signer`](crypto::Signer).
//! - **transaction**: canonical payloads, preimage, hash, build + sign.
//! - **nonce**: the per-account [`NonceAllocator`](nonce::NonceAllocator).
//!   The only shared mutable state in the process.
//! - **network**: [`NodeClient`](network::NodeClient): priming lookups and
//!   single-shot submission.
//! - **load**: the shared issuance pipeline and the generator tick.
//! - **config**: the JSON config file and every default.
//!
//! ## Invariants
//!
//! 1. No two transactions accepted for the same account share a nonce.
//! 2. A nonce whose transaction failed to build or submit is reissued, not
//!    burned.
//! 3. The nonce lock is never held across a network call.

pub mod config;
pub mod crypto;
pub mod load;
pub mod network;
pub mod nonce;
pub mod transaction;

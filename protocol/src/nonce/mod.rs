//! # Nonce Allocation
//!
//! Per-account sequence numbers shared by the load generator and the
//! faucet. See [`allocator`] for the reservation protocol.

pub mod allocator;

use async_trait::async_trait;
use thiserror::Error;

use crate::network::NodeError;

pub use allocator::{NonceAllocator, Reservation};

/// Where priming gets each account's committed nonce from.
///
/// The node client is the production implementation. Tests substitute a
/// fixed map.
#[async_trait]
pub trait NonceSource: Send + Sync {
    async fn committed_nonce(&self, account: &str) -> Result<u64, NodeError>;
}

/// Priming failures. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum PrimeError {
    #[error("fetch nonce for {account}: {source}")]
    Fetch {
        account: String,
        #[source]
        source: NodeError,
    },

    #[error("nonce counter for {account} is exhausted")]
    Exhausted { account: String },
}

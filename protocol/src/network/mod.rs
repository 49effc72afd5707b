//! # Ledger Node Access
//!
//! Everything that talks to the remote node over HTTP.
//!
//! - **client**: [`NodeClient`], with account lookups for priming and single-shot
//!   transaction submission.
//! - **rpc**: wire types for the node's JSON responses.
//!
//! The rest of the crate depends on the [`TransactionSink`] and
//! [`NonceSource`](crate::nonce::NonceSource) traits rather than on the
//! client directly, so tests can run the whole pipeline against in-memory
//! doubles.

pub mod client;
pub mod rpc;

use async_trait::async_trait;
use thiserror::Error;

use crate::transaction::Transaction;

pub use client::NodeClient;
pub use rpc::AccountState;

/// Failures talking to the node. There are no retries at this layer.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Connection refused, DNS failure, timeout, TLS, and the like.
    #[error("send request: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node answered with anything other than 200.
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("serialize transaction: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decode response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl NodeError {
    /// Whether the request ran out of time.
    pub fn is_timeout(&self) -> bool {
        match self {
            NodeError::Transport(e) | NodeError::Decode(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Delivers one signed transaction. Success means the node returned 200.
#[async_trait]
pub trait TransactionSink: Send + Sync {
    async fn submit(&self, tx: &Transaction) -> Result<(), NodeError>;
}

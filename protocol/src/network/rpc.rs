//! Wire types for the ledger node's HTTP API.
//!
//! | Method | Path                  | Body / Response                                   |
//! |--------|-----------------------|---------------------------------------------------|
//! | GET    | `/account/{address}`  | → `{balance, nonce}`                              |
//! | POST   | `/transaction`        | `{v, from, to, amount, fee, sig, nonce, payload}` |
//!
//! The transaction body is [`Transaction`](crate::transaction::Transaction)'s
//! own serde form.

use serde::{Deserialize, Serialize};

/// Path segment for account lookups.
pub const ACCOUNT_PATH: &str = "account";

/// Path segment for transaction submission.
pub const TRANSACTION_PATH: &str = "transaction";

/// Response of `GET /account/{address}`.
///
/// Some node builds emit capitalised field names, so both spellings are
/// accepted. Missing fields read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    #[serde(default, alias = "Balance")]
    pub balance: u64,
    #[serde(default, alias = "Nonce")]
    pub nonce: u64,
}

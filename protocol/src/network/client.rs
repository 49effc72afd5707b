//! HTTP client for the ledger node.
//!
//! One shared `reqwest::Client` (connection pooling) with the configured
//! request timeout applied to every call. Each operation is a single
//! attempt; retry policy belongs to the caller.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;

use super::rpc::{AccountState, ACCOUNT_PATH, TRANSACTION_PATH};
use super::{NodeError, TransactionSink};
use crate::nonce::NonceSource;
use crate::transaction::Transaction;

/// Talks to one ledger node.
#[derive(Debug, Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl NodeClient {
    /// Builds a client for `node_url`. A trailing `/` is ignored.
    pub fn new(node_url: &str, timeout: Duration) -> Result<Self, NodeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self {
            http,
            base_url: node_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// `GET /account/{address}`.
    pub async fn account(&self, address: &str) -> Result<AccountState, NodeError> {
        let url = self.endpoint(&format!("{}/{}", ACCOUNT_PATH, address));
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(NodeError::UnexpectedStatus(status.as_u16()));
        }

        resp.json::<AccountState>().await.map_err(NodeError::Decode)
    }

    /// `POST /transaction`. Only HTTP 200 counts as success; the response
    /// body is ignored.
    pub async fn submit(&self, tx: &Transaction) -> Result<(), NodeError> {
        let body = serde_json::to_vec(tx).map_err(NodeError::Encode)?;
        let resp = self
            .http
            .post(self.endpoint(TRANSACTION_PATH))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(NodeError::UnexpectedStatus(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl NonceSource for NodeClient {
    async fn committed_nonce(&self, account: &str) -> Result<u64, NodeError> {
        Ok(self.account(account).await?.nonce)
    }
}

#[async_trait]
impl TransactionSink for NodeClient {
    async fn submit(&self, tx: &Transaction) -> Result<(), NodeError> {
        NodeClient::submit(self, tx).await
    }
}

//! The issuance pipeline shared by the generator and the faucet.
//!
//! ```text
//! reserve nonce ──► pick recipient ──► build + sign ──► submit ──► resolve
//!       │                 │                 │              │
//!       └─ skip           └── rollback ─────┴── rollback ──┘ (on failure)
//! ```
//!
//! Both call sites go through [`Issuer::issue`] with the same
//! [`NonceAllocator`], which is what keeps their nonces apart.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::SenderConfig;
use crate::crypto::signatures::Signer;
use crate::network::{NodeError, TransactionSink};
use crate::nonce::NonceAllocator;
use crate::transaction::{build_transaction, pick_recipient, BuildError, Payload};

/// Which call site issued a transaction. Used in logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Generator,
    Faucet,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Generator => "generator",
            Origin::Faucet => "faucet",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the transfer goes.
#[derive(Debug, Clone, Copy)]
pub enum Recipient<'a> {
    /// Pick from the sender's configured recipients.
    Configured,
    /// A caller-supplied address (faucet requests).
    Address(&'a str),
}

/// What a successful issuance put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub fee: u64,
    pub nonce: u64,
}

/// Why an issuance did not go through. The reservation, if any, has
/// already been rolled back by the time the caller sees this.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("nonce unavailable for {account}")]
    NonceUnavailable { account: String },

    #[error("build tx (from={from} nonce={nonce}): {source}")]
    Build {
        from: String,
        nonce: u64,
        #[source]
        source: BuildError,
    },

    #[error("submit tx (hash={hash} from={from} to={to} nonce={nonce}): {source}")]
    Submit {
        hash: String,
        from: String,
        to: String,
        nonce: u64,
        #[source]
        source: NodeError,
    },
}

impl IssueError {
    /// The nonce that was reserved and then released, if one was reserved.
    pub fn released_nonce(&self) -> Option<u64> {
        match self {
            IssueError::NonceUnavailable { .. } => None,
            IssueError::Build { nonce, .. } | IssueError::Submit { nonce, .. } => Some(*nonce),
        }
    }
}

/// Reserve → build → submit → resolve, for one transaction at a time.
pub struct Issuer {
    allocator: Arc<NonceAllocator>,
    sink: Arc<dyn TransactionSink>,
    signer: Arc<dyn Signer>,
}

impl Issuer {
    pub fn new(
        allocator: Arc<NonceAllocator>,
        sink: Arc<dyn TransactionSink>,
        signer: Arc<dyn Signer>,
    ) -> Self {
        Self {
            allocator,
            sink,
            signer,
        }
    }

    pub fn allocator(&self) -> &Arc<NonceAllocator> {
        &self.allocator
    }

    /// Issues one transfer from `sender`.
    ///
    /// The nonce lock is only held inside `reserve` and the resolve call;
    /// the submission round-trip runs without it.
    pub async fn issue(
        &self,
        origin: Origin,
        sender: &SenderConfig,
        recipient: Recipient<'_>,
        amount: u64,
        payload: Payload,
    ) -> Result<Receipt, IssueError> {
        let account = sender.public_key.as_str();

        let Some(reservation) = self.allocator.reserve(account) else {
            tracing::warn!(%origin, account, "skip tx: nonce not initialized");
            return Err(IssueError::NonceUnavailable {
                account: account.to_string(),
            });
        };
        let nonce = reservation.nonce();

        let to = match recipient {
            Recipient::Address(address) => address.to_string(),
            Recipient::Configured => match pick_recipient(sender) {
                Ok(to) => to,
                Err(source) => {
                    reservation.rollback();
                    tracing::warn!(%origin, account, nonce, error = %source, "skip tx: no recipient");
                    return Err(IssueError::Build {
                        from: account.to_string(),
                        nonce,
                        source,
                    });
                }
            },
        };

        let tx = match build_transaction(sender, self.signer.as_ref(), nonce, amount, &to, payload)
        {
            Ok(tx) => tx,
            Err(source) => {
                reservation.rollback();
                tracing::warn!(%origin, account, to = %to, nonce, error = %source, "skip tx: build failed");
                return Err(IssueError::Build {
                    from: account.to_string(),
                    nonce,
                    source,
                });
            }
        };
        let hash = tx.hash();

        if let Err(source) = self.sink.submit(&tx).await {
            reservation.rollback();
            tracing::warn!(
                %origin,
                hash = %hash,
                from = account,
                to = %to,
                nonce,
                error = %source,
                "tx submit failed"
            );
            return Err(IssueError::Submit {
                hash,
                from: account.to_string(),
                to,
                nonce,
                source,
            });
        }

        reservation.commit();
        tracing::info!(
            %origin,
            hash = %hash,
            from = account,
            to = %to,
            amount = tx.amount(),
            fee = tx.fee(),
            nonce,
            "submitted tx"
        );

        Ok(Receipt {
            hash,
            from: account.to_string(),
            to,
            amount: tx.amount(),
            fee: tx.fee(),
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretKey;
    use crate::crypto::keys::AccountKeypair;
    use crate::crypto::signatures::Ed25519Signer;
    use crate::transaction::Transaction;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingSink {
        accepted: Mutex<Vec<Transaction>>,
        fail_nonces: Vec<u64>,
    }

    #[async_trait]
    impl TransactionSink for RecordingSink {
        async fn submit(&self, tx: &Transaction) -> Result<(), NodeError> {
            if self.fail_nonces.contains(&tx.nonce()) {
                return Err(NodeError::UnexpectedStatus(500));
            }
            self.accepted.lock().push(tx.clone());
            Ok(())
        }
    }

    fn sender(recipients: &[&str]) -> SenderConfig {
        let kp = AccountKeypair::from_seed(&[3u8; 32]);
        SenderConfig {
            name: "alpha".into(),
            public_key: kp.public_key_hex(),
            private_key: SecretKey::new(kp.secret_key_hex()),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            amount: 10,
            fee: 1,
            version: 1,
            payload: None,
        }
    }

    fn issuer_with(sink: Arc<RecordingSink>, sender: &SenderConfig, next: u64) -> Issuer {
        let allocator = Arc::new(NonceAllocator::new());
        allocator.seed(&sender.public_key, next);
        Issuer::new(allocator, sink, Arc::new(Ed25519Signer))
    }

    #[tokio::test]
    async fn success_commits_nonce() {
        let sink = Arc::new(RecordingSink::default());
        let s = sender(&["r1"]);
        let issuer = issuer_with(Arc::clone(&sink), &s, 5);

        let receipt = issuer
            .issue(Origin::Generator, &s, Recipient::Configured, 10, Payload::empty())
            .await
            .unwrap();

        assert_eq!(receipt.nonce, 5);
        assert_eq!(receipt.to, "r1");
        assert_eq!(issuer.allocator().peek(&s.public_key), Some(6));
        assert_eq!(sink.accepted.lock()[0].hash(), receipt.hash);
    }

    #[tokio::test]
    async fn submit_failure_releases_nonce() {
        let sink = Arc::new(RecordingSink {
            fail_nonces: vec![5],
            ..Default::default()
        });
        let s = sender(&["r1"]);
        let issuer = issuer_with(Arc::clone(&sink), &s, 5);

        let err = issuer
            .issue(Origin::Faucet, &s, Recipient::Address("r9"), 50, Payload::empty())
            .await
            .unwrap_err();

        assert!(matches!(err, IssueError::Submit { nonce: 5, ref to, .. } if to == "r9"));
        assert_eq!(err.released_nonce(), Some(5));
        assert_eq!(issuer.allocator().peek(&s.public_key), Some(5));
        assert!(sink.accepted.lock().is_empty());
    }

    #[tokio::test]
    async fn missing_recipients_releases_nonce() {
        let sink = Arc::new(RecordingSink::default());
        let s = sender(&[]);
        let issuer = issuer_with(Arc::clone(&sink), &s, 2);

        let err = issuer
            .issue(Origin::Generator, &s, Recipient::Configured, 10, Payload::empty())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IssueError::Build { source: BuildError::NoRecipients { .. }, .. }
        ));
        assert_eq!(issuer.allocator().peek(&s.public_key), Some(2));
    }

    #[tokio::test]
    async fn bad_key_releases_nonce() {
        let sink = Arc::new(RecordingSink::default());
        let mut s = sender(&["r1"]);
        s.private_key = SecretKey::new("garbage".into());
        let issuer = issuer_with(Arc::clone(&sink), &s, 2);

        let err = issuer
            .issue(Origin::Generator, &s, Recipient::Configured, 10, Payload::empty())
            .await
            .unwrap_err();

        assert!(matches!(err, IssueError::Build { source: BuildError::Sign(_), .. }));
        assert_eq!(issuer.allocator().peek(&s.public_key), Some(2));
    }

    #[tokio::test]
    async fn unprimed_sender_is_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let s = sender(&["r1"]);
        let issuer = Issuer::new(
            Arc::new(NonceAllocator::new()),
            Arc::clone(&sink) as Arc<dyn TransactionSink>,
            Arc::new(Ed25519Signer),
        );

        let err = issuer
            .issue(Origin::Generator, &s, Recipient::Configured, 10, Payload::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, IssueError::NonceUnavailable { .. }));
        assert_eq!(err.released_nonce(), None);
    }

    #[tokio::test]
    async fn payload_is_carried_and_signed() {
        let sink = Arc::new(RecordingSink::default());
        let s = sender(&["r1"]);
        let issuer = issuer_with(Arc::clone(&sink), &s, 0);
        let payload = Payload::try_from(json!({ "memo": "hi" })).unwrap();

        issuer
            .issue(Origin::Faucet, &s, Recipient::Address("r2"), 3, payload.clone())
            .await
            .unwrap();

        let tx = sink.accepted.lock()[0].clone();
        assert_eq!(tx.payload(), &payload);
        assert!(Ed25519Signer::verify(tx.from(), &tx.hash(), tx.signature()));
    }

    #[test]
    fn origin_labels() {
        assert_eq!(Origin::Generator.to_string(), "generator");
        assert_eq!(Origin::Faucet.as_str(), "faucet");
    }
}

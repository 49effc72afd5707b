//! One generator tick.
//!
//! A tick walks the senders in configuration order and issues
//! `transactions_per_sender` transfers from each, strictly one after
//! another. The generator therefore never holds two reservations for the
//! same account at once; only the faucet can race it.
//!
//! The clock that drives ticks lives in the binary.

use std::sync::Arc;

use super::issuer::{IssueError, Issuer, Origin, Receipt, Recipient};
use crate::config::{LoadConfig, SenderConfig};
use crate::transaction::Payload;

/// Outcome of one attempted transaction within a tick.
#[derive(Debug)]
pub struct TxOutcome {
    pub sender: String,
    pub result: Result<Receipt, IssueError>,
}

/// Everything a tick attempted, in order.
#[derive(Debug, Default)]
pub struct TickReport {
    pub outcomes: Vec<TxOutcome>,
}

impl TickReport {
    pub fn receipts(&self) -> impl Iterator<Item = &Receipt> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = &IssueError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn submitted(&self) -> usize {
        self.receipts().count()
    }

    /// Attempts that never got a nonce.
    pub fn skipped(&self) -> usize {
        self.errors()
            .filter(|e| matches!(e, IssueError::NonceUnavailable { .. }))
            .count()
    }

    /// Attempts that reserved a nonce and then had to release it.
    pub fn failed(&self) -> usize {
        self.errors().filter(|e| e.released_nonce().is_some()).count()
    }
}

/// Drives periodic issuance for every configured sender.
pub struct LoadGenerator {
    issuer: Arc<Issuer>,
    senders: Vec<SenderConfig>,
    transactions_per_sender: u32,
    default_payload: Option<Payload>,
}

impl LoadGenerator {
    pub fn new(issuer: Arc<Issuer>, config: &LoadConfig) -> Self {
        Self {
            issuer,
            senders: config.senders.clone(),
            transactions_per_sender: config.transactions_per_sender(),
            default_payload: config.default_payload.clone(),
        }
    }

    pub fn transactions_per_sender(&self) -> u32 {
        self.transactions_per_sender
    }

    /// Runs one tick to completion. Failures are recorded in the report and
    /// never stop the tick.
    pub async fn run_tick(&self) -> TickReport {
        let mut report = TickReport::default();

        for sender in &self.senders {
            // Sender payload overrides the process-wide default.
            let payload = Payload::first_non_empty([
                sender.payload.as_ref(),
                self.default_payload.as_ref(),
            ]);

            for _ in 0..self.transactions_per_sender {
                let result = self
                    .issuer
                    .issue(
                        Origin::Generator,
                        sender,
                        Recipient::Configured,
                        sender.amount,
                        payload.clone(),
                    )
                    .await;
                report.outcomes.push(TxOutcome {
                    sender: sender.name.clone(),
                    result,
                });
            }
        }

        report
    }
}

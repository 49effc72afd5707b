//! # Prometheus Metrics
//!
//! Operational counters for the generator and the faucet, served at
//! `/metrics` on the faucet listener and optionally on a dedicated address.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with
//! the `txpulse` namespace so they do not collide with any default global
//! registry consumers.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

use txpulse_protocol::load::{IssueError, Origin, Receipt, TickReport};
use txpulse_protocol::network::{NodeError, TransactionSink};
use txpulse_protocol::transaction::Transaction;

/// Holds all Prometheus metric handles for the process.
///
/// Prometheus handles are internally reference counted, so this is cheap
/// to clone into request handlers and background tasks.
#[derive(Clone)]
pub struct LoadMetrics {
    registry: Registry,
    /// Generator ticks completed.
    pub ticks_total: IntCounter,
    /// Transactions accepted by the node, by origin.
    pub transactions_submitted_total: IntCounterVec,
    /// Transactions that reserved a nonce and then failed, by origin.
    pub transactions_failed_total: IntCounterVec,
    /// Reservations released back to the allocator.
    pub nonce_rollbacks_total: IntCounter,
    /// Issuances skipped because the sender had no primed nonce, by origin.
    pub reservations_skipped_total: IntCounterVec,
    /// Faucet responses, by HTTP status code.
    pub faucet_requests_total: IntCounterVec,
    /// Round-trip time of `POST /transaction`, by outcome.
    pub submission_latency_seconds: HistogramVec,
}

impl LoadMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("txpulse".into()), None)?;

        let ticks_total = IntCounter::new("ticks_total", "Generator ticks completed")?;
        registry.register(Box::new(ticks_total.clone()))?;

        let transactions_submitted_total = IntCounterVec::new(
            Opts::new(
                "transactions_submitted_total",
                "Transactions accepted by the node",
            ),
            &["origin"],
        )?;
        registry.register(Box::new(transactions_submitted_total.clone()))?;

        let transactions_failed_total = IntCounterVec::new(
            Opts::new(
                "transactions_failed_total",
                "Transactions that failed to build or submit after reserving a nonce",
            ),
            &["origin"],
        )?;
        registry.register(Box::new(transactions_failed_total.clone()))?;

        let nonce_rollbacks_total = IntCounter::new(
            "nonce_rollbacks_total",
            "Reserved nonces released back to the allocator",
        )?;
        registry.register(Box::new(nonce_rollbacks_total.clone()))?;

        let reservations_skipped_total = IntCounterVec::new(
            Opts::new(
                "reservations_skipped_total",
                "Issuances skipped because the account was not primed",
            ),
            &["origin"],
        )?;
        registry.register(Box::new(reservations_skipped_total.clone()))?;

        let faucet_requests_total = IntCounterVec::new(
            Opts::new("faucet_requests_total", "Faucet responses by HTTP status"),
            &["status"],
        )?;
        registry.register(Box::new(faucet_requests_total.clone()))?;

        let submission_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "submission_latency_seconds",
                "Round-trip time of transaction submission in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["outcome"],
        )?;
        registry.register(Box::new(submission_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            ticks_total,
            transactions_submitted_total,
            transactions_failed_total,
            nonce_rollbacks_total,
            reservations_skipped_total,
            faucet_requests_total,
            submission_latency_seconds,
        })
    }

    /// Counts one issuance outcome.
    pub fn record_issue(&self, origin: Origin, result: &Result<Receipt, IssueError>) {
        let label = origin.as_str();
        match result {
            Ok(_) => self
                .transactions_submitted_total
                .with_label_values(&[label])
                .inc(),
            Err(IssueError::NonceUnavailable { .. }) => self
                .reservations_skipped_total
                .with_label_values(&[label])
                .inc(),
            Err(_) => {
                self.transactions_failed_total
                    .with_label_values(&[label])
                    .inc();
                self.nonce_rollbacks_total.inc();
            }
        }
    }

    /// Counts a finished generator tick and everything it attempted.
    pub fn record_tick(&self, report: &TickReport) {
        self.ticks_total.inc();
        for outcome in &report.outcomes {
            self.record_issue(Origin::Generator, &outcome.result);
        }
    }

    pub fn record_faucet_status(&self, status: StatusCode) {
        self.faucet_requests_total
            .with_label_values(&[status.as_str()])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<LoadMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Instrumented sink
// ---------------------------------------------------------------------------

/// Wraps a [`TransactionSink`] and records submission latency.
pub struct InstrumentedSink {
    inner: Arc<dyn TransactionSink>,
    latency: HistogramVec,
}

impl InstrumentedSink {
    pub fn new(inner: Arc<dyn TransactionSink>, metrics: &LoadMetrics) -> Self {
        Self {
            inner,
            latency: metrics.submission_latency_seconds.clone(),
        }
    }
}

#[async_trait]
impl TransactionSink for InstrumentedSink {
    async fn submit(&self, tx: &Transaction) -> Result<(), NodeError> {
        let started = Instant::now();
        let result = self.inner.submit(tx).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        self.latency
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txpulse_protocol::load::TxOutcome;

    struct FailingSink;

    #[async_trait]
    impl TransactionSink for FailingSink {
        async fn submit(&self, _tx: &Transaction) -> Result<(), NodeError> {
            Err(NodeError::UnexpectedStatus(503))
        }
    }

    fn receipt(nonce: u64) -> Receipt {
        Receipt {
            hash: "h".into(),
            from: "a".into(),
            to: "b".into(),
            amount: 1,
            fee: 0,
            nonce,
        }
    }

    #[test]
    fn tick_report_is_counted_by_outcome() {
        let metrics = LoadMetrics::new().unwrap();
        let report = TickReport {
            outcomes: vec![
                TxOutcome {
                    sender: "a".into(),
                    result: Ok(receipt(1)),
                },
                TxOutcome {
                    sender: "a".into(),
                    result: Err(IssueError::NonceUnavailable {
                        account: "a".into(),
                    }),
                },
                TxOutcome {
                    sender: "a".into(),
                    result: Err(IssueError::Submit {
                        hash: "h".into(),
                        from: "a".into(),
                        to: "b".into(),
                        nonce: 2,
                        source: NodeError::UnexpectedStatus(500),
                    }),
                },
            ],
        };

        metrics.record_tick(&report);

        assert_eq!(metrics.ticks_total.get(), 1);
        let gen = &["generator"];
        assert_eq!(metrics.transactions_submitted_total.with_label_values(gen).get(), 1);
        assert_eq!(metrics.reservations_skipped_total.with_label_values(gen).get(), 1);
        assert_eq!(metrics.transactions_failed_total.with_label_values(gen).get(), 1);
        assert_eq!(metrics.nonce_rollbacks_total.get(), 1);
    }

    #[test]
    fn encode_uses_namespace() {
        let metrics = LoadMetrics::new().unwrap();
        metrics.record_faucet_status(StatusCode::BAD_REQUEST);
        let text = metrics.encode().unwrap();
        assert!(text.contains("txpulse_ticks_total"));
        assert!(text.contains("txpulse_faucet_requests_total{status=\"400\"} 1"));
    }

    #[tokio::test]
    async fn instrumented_sink_observes_latency_and_passes_errors_through() {
        let metrics = LoadMetrics::new().unwrap();
        let sink = InstrumentedSink::new(Arc::new(FailingSink), &metrics);
        let tx: Transaction = serde_json::from_value(serde_json::json!({
            "v": 1, "from": "a", "to": "b", "amount": 1, "fee": 0, "sig": "", "nonce": 0
        }))
        .unwrap();

        let err = sink.submit(&tx).await.unwrap_err();
        assert!(matches!(err, NodeError::UnexpectedStatus(503)));
        assert_eq!(
            metrics
                .submission_latency_seconds
                .with_label_values(&["error"])
                .get_sample_count(),
            1
        );
    }
}

//! # Faucet API
//!
//! Builds the axum router served on the faucet listener. Every request runs
//! on its own task, so faucet issuances race each other and the generator;
//! the shared [`Issuer`] and its allocator keep their nonces apart.
//!
//! ## Endpoints
//!
//! | Method | Path       | Description                               |
//! |--------|------------|-------------------------------------------|
//! | POST   | `/faucet`  | Issue one transfer to a caller's address  |
//! | GET    | `/health`  | Liveness probe                            |
//! | GET    | `/metrics` | Prometheus text exposition                |
//!
//! ## Faucet status codes
//!
//! | Status | When                                                      |
//! |--------|-----------------------------------------------------------|
//! | 200    | Node accepted the transaction                             |
//! | 400    | Not a POST, unparseable body, empty address, zero amount  |
//! | 500    | Sender not primed, or the transaction could not be built  |
//! | 502    | The node rejected the transaction or could not be reached |

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use txpulse_protocol::config::SenderConfig;
use txpulse_protocol::load::{IssueError, Issuer, Origin, Recipient};
use txpulse_protocol::transaction::Payload;

use crate::metrics::{self, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state available to all request handlers.
///
/// Cheap to clone: everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline shared with the generator.
    pub issuer: Arc<Issuer>,
    /// The account every faucet transfer is sent from.
    pub sender: Arc<SenderConfig>,
    /// `faucet.payload` from the config file.
    pub faucet_payload: Option<Payload>,
    /// Top-level `defaultPayload` from the config file.
    pub default_payload: Option<Payload>,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

/// Body of `POST /faucet`.
#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub payload: Option<Payload>,
}

/// Body of every faucet response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaucetResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl FaucetResponse {
    fn ok() -> Self {
        Self {
            status: "ok".into(),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            error: Some(message.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the faucet [`Router`] with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(Arc::clone(&state.metrics));

    Router::new()
        .route("/faucet", any(faucet_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .merge(metrics_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: 200 while the process is up.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `POST /faucet`: issue one transfer from the faucet sender.
///
/// Accepts any method so that a wrong one gets the faucet's JSON error body
/// instead of an empty 405.
async fn faucet_handler(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if method != Method::POST {
        return reply(&state, StatusCode::BAD_REQUEST, FaucetResponse::error("method not allowed"));
    }

    let req: FaucetRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            return reply(
                &state,
                StatusCode::BAD_REQUEST,
                FaucetResponse::error(format!("invalid json: {}", e)),
            );
        }
    };

    let address = req.address.as_str();
    if address.is_empty() {
        return reply(&state, StatusCode::BAD_REQUEST, FaucetResponse::error("address is required"));
    }
    if req.amount == 0 {
        return reply(&state, StatusCode::BAD_REQUEST, FaucetResponse::error("amount must be > 0"));
    }

    // Request payload, then the faucet's own, then the process default.
    let payload = Payload::first_non_empty([
        req.payload.as_ref(),
        state.faucet_payload.as_ref(),
        state.default_payload.as_ref(),
    ]);

    let result = state
        .issuer
        .issue(
            Origin::Faucet,
            &state.sender,
            Recipient::Address(address),
            req.amount,
            payload,
        )
        .await;
    state.metrics.record_issue(Origin::Faucet, &result);

    match result {
        Ok(receipt) => {
            tracing::info!(
                hash = %receipt.hash,
                to = %receipt.to,
                amount = receipt.amount,
                nonce = receipt.nonce,
                "faucet transfer submitted"
            );
            reply(&state, StatusCode::OK, FaucetResponse::ok())
        }
        Err(e) => {
            let status = status_for(&e);
            tracing::warn!(to = address, status = status.as_u16(), error = %e, "faucet request failed");
            reply(&state, status, FaucetResponse::error(e.to_string()))
        }
    }
}

fn status_for(err: &IssueError) -> StatusCode {
    match err {
        IssueError::NonceUnavailable { .. } | IssueError::Build { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        IssueError::Submit { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn reply(state: &AppState, status: StatusCode, body: FaucetResponse) -> Response {
    state.metrics.record_faucet_status(status);
    (status, Json(body)).into_response()
}

use axum::extract::State;
use axum::{routing::get, Json, Router};
use hookd_worker::DispatcherState;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` while the dispatcher accepts jobs, `draining` otherwise.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Dispatcher lifecycle state.
    pub dispatcher: DispatcherState,
    /// Worker pool size.
    pub workers: usize,
    /// Jobs waiting for a worker.
    pub queue_len: usize,
    /// Jobs currently executing.
    pub in_flight: usize,
}

/// GET /health -- returns service and dispatcher health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let dispatcher = state.dispatcher.state();
    let status = if dispatcher == DispatcherState::Running {
        "ok"
    } else {
        "draining"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        dispatcher,
        workers: state.dispatcher.pool_size(),
        queue_len: state.dispatcher.queue_len(),
        in_flight: state.dispatcher.stats().in_flight,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

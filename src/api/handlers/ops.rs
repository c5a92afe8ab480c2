use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

/// GET /health — liveness plus ingestion queue headroom.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.ingest_tx.is_closed() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "ingestion": "stopped" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "ingest_capacity": state.ingest_tx.capacity(),
            "pending_allocations": state.ledger.pending_allocation_count().await,
        })),
    )
}

/// GET /metrics — Prometheus scrape payload.
pub async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics_handle.render();
    ([(CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

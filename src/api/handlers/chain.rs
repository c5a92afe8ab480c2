use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use tokio::sync::mpsc::error::TrySendError;

use crate::errors::AppError;
use crate::ingestion::ChainEvent;
use crate::AppState;

/// POST /api/chain/events — queue a listener notification for the ingestion
/// pipeline. Answers 202 once queued; a full queue is 503 so the listener
/// retries.
pub async fn enqueue(
    State(state): State<AppState>,
    Json(event): Json<ChainEvent>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let hash = event.hash().to_string();

    match state.ingest_tx.try_send(event) {
        Ok(()) => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "success": true, "queued": hash })),
        )),
        Err(TrySendError::Full(_)) => {
            tracing::warn!(hash = %hash, "Ingestion queue full");
            Err(AppError::Unavailable("ingestion queue full".into()))
        }
        Err(TrySendError::Closed(_)) => Err(AppError::Internal(anyhow::anyhow!(
            "ingestion pipeline stopped"
        ))),
    }
}

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ledger::{ConfigSnapshot, LedgerError, SplitChange, SplitSummary};
use crate::models::RecipientUpdate;
use crate::AppState;

use super::{ok, ApiResponse};

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

// Percentages arrive as plain JSON numbers; out-of-range values (negative,
// huge) must surface as InvalidRecipient rather than a deserialisation error.

#[derive(Deserialize)]
pub struct AddRecipientRequest {
    pub name: String,
    pub percentage: i64,
    pub address: String,
}

#[derive(Deserialize)]
pub struct UpdateRecipientRequest {
    pub name: Option<String>,
    pub percentage: Option<i64>,
    pub address: Option<String>,
}

fn percentage(value: i64) -> Result<u32, LedgerError> {
    u32::try_from(value)
        .map_err(|_| LedgerError::InvalidRecipient(format!("percentage {value} outside 1..=100")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/split — recipients, total and validity flag
pub async fn get_split(State(state): State<AppState>) -> Json<ApiResponse<SplitSummary>> {
    ok(state.ledger.split().await)
}

/// POST /api/split/recipients
pub async fn add_recipient(
    State(state): State<AppState>,
    Json(body): Json<AddRecipientRequest>,
) -> Result<Json<ApiResponse<SplitChange>>, AppError> {
    let change = state
        .ledger
        .add_recipient(&body.name, percentage(body.percentage)?, &body.address)
        .await?;
    Ok(ok(change))
}

/// PUT /api/split/recipients/{id}
pub async fn update_recipient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRecipientRequest>,
) -> Result<Json<ApiResponse<SplitChange>>, AppError> {
    let update = RecipientUpdate {
        name: body.name,
        percentage: body.percentage.map(percentage).transpose()?,
        address: body.address,
    };
    Ok(ok(state.ledger.update_recipient(id, update).await?))
}

/// DELETE /api/split/recipients/{id}
pub async fn remove_recipient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SplitChange>>, AppError> {
    Ok(ok(state.ledger.remove_recipient(id).await?))
}

/// GET /api/split/snapshots/{id} — the frozen split an allocation used
pub async fn snapshot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConfigSnapshot>>, AppError> {
    let snapshot = state
        .ledger
        .snapshot(id)
        .await
        .ok_or_else(|| LedgerError::not_found("snapshot", id))?;
    Ok(ok(snapshot))
}

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ledger::WithdrawalOutcome;
use crate::models::{Allocation, Withdrawal, WithdrawableBalance};
use crate::AppState;

use super::{ok, ApiResponse};

#[derive(Deserialize)]
pub struct WithdrawRequest {
    pub allocation_ids: Vec<Uuid>,
}

/// GET /api/withdrawals — past withdrawals, newest first
pub async fn history(State(state): State<AppState>) -> Json<ApiResponse<Vec<Withdrawal>>> {
    ok(state.ledger.withdrawals().await)
}

/// GET /api/withdrawals/balances — withdrawable totals per recipient and currency
pub async fn balances(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<WithdrawableBalance>>>, AppError> {
    Ok(ok(state.ledger.balances().await?))
}

/// GET /api/recipients/{id}/withdrawable
pub async fn withdrawable(
    State(state): State<AppState>,
    Path(recipient_id): Path<Uuid>,
) -> Json<ApiResponse<Vec<Allocation>>> {
    ok(state.ledger.list_withdrawable(recipient_id).await)
}

/// POST /api/recipients/{id}/withdraw — all-or-nothing batch withdrawal
pub async fn withdraw(
    State(state): State<AppState>,
    Path(recipient_id): Path<Uuid>,
    Json(body): Json<WithdrawRequest>,
) -> Result<Json<ApiResponse<WithdrawalOutcome>>, AppError> {
    if body.allocation_ids.is_empty() {
        return Err(AppError::BadRequest("allocation_ids must not be empty".into()));
    }

    let outcome = state
        .ledger
        .withdraw(recipient_id, &body.allocation_ids)
        .await?;
    Ok(ok(outcome))
}

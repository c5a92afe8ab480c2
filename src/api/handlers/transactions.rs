use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ledger::{Confirmation, LedgerError, TransactionFilter};
use crate::models::{
    Allocation, Currency, Direction, Money, NewTransaction, Transaction, TransactionStatus,
};
use crate::AppState;

use super::{ok, ApiResponse};

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Flat transaction shape, as the history UI and chain listeners send it.
#[derive(Deserialize)]
pub struct RecordTransactionRequest {
    pub direction: Direction,
    pub amount: Decimal,
    pub currency: Currency,
    pub network: String,
    pub hash: String,
    pub status: Option<TransactionStatus>,
    pub created_at: Option<DateTime<Utc>>,
}

impl RecordTransactionRequest {
    fn into_new_transaction(self) -> Result<NewTransaction, LedgerError> {
        Ok(NewTransaction {
            direction: self.direction,
            money: Money::new(self.amount, self.currency, self.network)?,
            hash: self.hash,
            status: self.status,
            created_at: self.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/transactions?q=&direction=&status= — history feed, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> Json<ApiResponse<Vec<Transaction>>> {
    ok(state.ledger.transactions(&filter).await)
}

/// GET /api/transactions/{id}
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let tx = state
        .ledger
        .transaction(id)
        .await
        .ok_or_else(|| LedgerError::not_found("transaction", id))?;
    Ok(ok(tx))
}

/// POST /api/transactions — record a newly observed transfer
pub async fn record(
    State(state): State<AppState>,
    Json(body): Json<RecordTransactionRequest>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let tx = state.ledger.record(body.into_new_transaction()?).await?;
    Ok(ok(tx))
}

/// POST /api/transactions/{id}/processing
pub async fn processing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    Ok(ok(state.ledger.mark_processing(id).await?))
}

/// POST /api/transactions/{id}/confirm — confirm and, if enabled, allocate
pub async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Confirmation>>, AppError> {
    Ok(ok(state.ledger.confirm(id).await?))
}

/// POST /api/transactions/{id}/fail
pub async fn fail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    Ok(ok(state.ledger.fail(id).await?))
}

/// POST /api/transactions/{id}/allocate — split a confirmed incoming transfer
pub async fn allocate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Allocation>>>, AppError> {
    Ok(ok(state.ledger.allocate(id).await?))
}

/// GET /api/transactions/{id}/allocations
pub async fn allocations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Allocation>>>, AppError> {
    Ok(ok(state.ledger.allocations_for(id).await?))
}

/// POST /api/allocations/retry — allocate everything waiting on a valid split
pub async fn retry_pending(State(state): State<AppState>) -> Json<ApiResponse<Vec<Allocation>>> {
    ok(state.ledger.allocate_pending().await)
}

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::AppError;
use crate::ledger::{LedgerError, TransactionFilter};
use crate::models::Currency;
use crate::AppState;

use super::{ok, ApiResponse};

#[derive(Serialize)]
pub struct DashboardSummary {
    /// Withdrawable funds across all recipients, per currency.
    pub withdrawable: BTreeMap<Currency, String>,
    /// Confirmed incoming volume since 00:00 UTC, per currency.
    pub received_today: BTreeMap<Currency, String>,
    pub transactions_today: usize,
    pub pending_allocations: usize,
    pub split_total_percentage: u32,
    pub split_is_valid: bool,
}

/// GET /api/dashboard/summary — headline cards for the dashboard
pub async fn summary(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardSummary>>, AppError> {
    let mut withdrawable: BTreeMap<Currency, Decimal> = BTreeMap::new();
    for balance in state.ledger.balances().await? {
        accumulate(&mut withdrawable, balance.currency, balance.amount)?;
    }

    let today = Utc::now().date_naive();
    let todays: Vec<_> = state
        .ledger
        .transactions(&TransactionFilter::default())
        .await
        .into_iter()
        .filter(|tx| tx.created_at.date_naive() == today)
        .collect();

    let mut received_today: BTreeMap<Currency, Decimal> = BTreeMap::new();
    for tx in todays.iter().filter(|tx| tx.is_confirmed_incoming()) {
        accumulate(&mut received_today, tx.money.currency, tx.money.amount)?;
    }

    let split = state.ledger.split().await;

    Ok(ok(DashboardSummary {
        withdrawable: to_strings(withdrawable),
        received_today: to_strings(received_today),
        transactions_today: todays.len(),
        pending_allocations: state.ledger.pending_allocation_count().await,
        split_total_percentage: split.total_percentage,
        split_is_valid: split.is_valid,
    }))
}

fn accumulate(
    totals: &mut BTreeMap<Currency, Decimal>,
    currency: Currency,
    amount: Decimal,
) -> Result<(), LedgerError> {
    let total = totals.entry(currency).or_default();
    *total = total
        .checked_add(amount)
        .ok_or_else(|| LedgerError::InvalidAmount(format!("{currency} total overflows")))?;
    Ok(())
}

fn to_strings(totals: BTreeMap<Currency, Decimal>) -> BTreeMap<Currency, String> {
    totals
        .into_iter()
        .map(|(currency, mut amount)| {
            amount.rescale(currency.minor_units());
            (currency, amount.to_string())
        })
        .collect()
}

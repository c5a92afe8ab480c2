use serde::Serialize;
use uuid::Uuid;

use super::SplitSummary;
use crate::models::{Allocation, Transaction, Withdrawal};

/// Change notifications broadcast to live dashboard clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum LedgerEvent {
    #[serde(rename = "transaction_recorded")]
    TransactionRecorded(Transaction),

    #[serde(rename = "transaction_updated")]
    TransactionUpdated(Transaction),

    #[serde(rename = "allocations_created")]
    AllocationsCreated(AllocationBatch),

    #[serde(rename = "split_updated")]
    SplitUpdated(SplitSummary),

    #[serde(rename = "withdrawal")]
    Withdrawal(Withdrawal),
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocationBatch {
    pub transaction_id: Uuid,
    pub allocations: Vec<Allocation>,
}

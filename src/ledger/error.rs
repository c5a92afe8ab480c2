use thiserror::Error;
use uuid::Uuid;

use crate::models::{Currency, TransactionStatus};

/// Every way a ledger operation can fail. A failed call never changes state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("transaction hash {0} already recorded")]
    DuplicateHash(String),

    #[error("transaction {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("allocation rejected for transaction {transaction_id}: {reason}")]
    AllocationRejected { transaction_id: Uuid, reason: String },

    #[error("transaction {0} is already allocated")]
    AlreadyAllocated(Uuid),

    #[error("allocation {0} is already withdrawn")]
    AlreadyWithdrawn(Uuid),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code surfaced to API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidRecipient(_) => "invalid_recipient",
            LedgerError::InvalidTransaction(_) => "invalid_transaction",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::CurrencyMismatch { .. } => "currency_mismatch",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::DuplicateHash(_) => "duplicate_hash",
            LedgerError::InvalidTransition { .. } => "invalid_transition",
            LedgerError::AllocationRejected { .. } => "allocation_rejected",
            LedgerError::AlreadyAllocated(_) => "already_allocated",
            LedgerError::AlreadyWithdrawn(_) => "already_withdrawn",
        }
    }
}
